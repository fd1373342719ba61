//! Discovery, recollection and change report integration tests

use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use smarthome_bridge::{Config, DetectedControl, protocol::is_valid_endpoint_id};

mod common;
use common::{bridge, bridge_with, dimmer, light};

fn flags(value: &Value, found: &mut Vec<bool>) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map {
                if key == "proactivelyReported" || key == "retrievable" {
                    if let Some(flag) = entry.as_bool() {
                        found.push(flag);
                    }
                }
                flags(entry, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|i| flags(i, found)),
        _ => {}
    }
}

#[tokio::test]
async fn discovery_describes_every_endpoint() {
    let thermostat = DetectedControl::new("thermostat")
        .with_state("set", "heating.setpoint")
        .with_state("actual", "heating.temperature")
        .in_room("Living Room", "Heating");
    let b = bridge(vec![dimmer("Lamp", "lamp.level"), thermostat]).await;

    let endpoints = b.discover().await;
    assert_eq!(endpoints.len(), 2);

    let lamp = &endpoints[0];
    assert_eq!(lamp["endpointId"], "Lamp");
    assert_eq!(lamp["manufacturerName"], "Smart Home Bridge");
    assert_eq!(lamp["displayCategories"], json!(["LIGHT"]));
    assert_eq!(lamp["capabilities"][0]["interface"], "Alexa");

    let heating = &endpoints[1];
    assert_eq!(heating["friendlyName"], "Living Room Heating");
    assert_eq!(heating["endpointId"], "Living_Room_Heating");

    let mut found = Vec::new();
    flags(&Value::Array(endpoints), &mut found);
    assert!(found.contains(&true));
}

#[tokio::test]
async fn unlicensed_discovery_disables_reporting() {
    let config = Config {
        valid_till: Some(Utc::now() - chrono::Duration::hours(1)),
        ..Config::default()
    };
    let b = bridge_with(vec![dimmer("Lamp", "lamp.level"), light("Hall", "hall.on")], config, None).await;

    let endpoints = b.discover().await;
    let mut found = Vec::new();
    flags(&Value::Array(endpoints), &mut found);

    assert!(!found.is_empty());
    assert!(found.iter().all(|flag| !flag));
}

#[tokio::test]
async fn endpoint_ids_are_stable_and_valid() {
    let names = ["Küche Decke", "Living Room", "a/b\\c", &"x".repeat(300)];
    let controls: Vec<DetectedControl> = names
        .iter()
        .enumerate()
        .map(|(i, name)| light(name, &format!("light{i}.on")))
        .collect();
    let b = bridge(controls).await;

    let first = b.manager.endpoint_ids().await;
    b.manager.collect().await.unwrap();
    let second = b.manager.endpoint_ids().await;

    assert_eq!(first, second);
    assert_eq!(first.len(), names.len());
    assert!(first.iter().all(|id| is_valid_endpoint_id(id)));
    assert_eq!(first[1], "Living_Room");
}

#[tokio::test]
async fn overlapping_collections_are_coalesced() {
    let b = bridge_with(
        vec![light("Lamp", "lamp.on")],
        Config::default(),
        Some(Duration::from_millis(50)),
    )
    .await;
    assert_eq!(b.detector.passes(), 1);

    b.detector
        .set_controls(vec![light("Lamp", "lamp.on"), light("Desk", "desk.on")]);
    let (a, c, d) = tokio::join!(b.manager.collect(), b.manager.collect(), b.manager.collect());
    assert!(a.is_ok() && c.is_ok() && d.is_ok());

    // one pass for the first request, one for the two that arrived during it
    assert_eq!(b.detector.passes(), 3);
    assert_eq!(b.manager.endpoint_ids().await, vec!["Lamp", "Desk"]);
}

#[tokio::test]
async fn recollection_updates_subscriptions() {
    let b = bridge(vec![light("Lamp", "lamp.on"), light("Desk", "desk.on")]).await;
    assert!(b.store.subscriptions().contains("desk.on"));

    b.detector.set_controls(vec![light("Lamp", "lamp.on")]);
    b.manager.collect().await.unwrap();

    let subscriptions = b.store.subscriptions();
    assert!(subscriptions.contains("lamp.on"));
    assert!(!subscriptions.contains("desk.on"));
}

#[tokio::test]
async fn identical_state_is_reported_once() {
    let b = bridge(vec![light("Lamp", "lamp.on")]).await;

    b.store.insert("lamp.on", json!(true));
    b.manager.on_state_change("lamp.on", Some(json!(true))).await;
    b.manager.on_state_change("lamp.on", Some(json!(true))).await;
    assert_eq!(b.change_reports().len(), 1);

    b.store.insert("lamp.on", json!(false));
    b.manager.on_state_change("lamp.on", Some(json!(false))).await;

    let reports = b.change_reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1]["event"]["payload"]["change"]["cause"]["type"], "PHYSICAL_INTERACTION");
    assert_eq!(reports[1]["event"]["payload"]["change"]["properties"][0]["value"], "OFF");
}

#[tokio::test]
async fn reported_state_survives_recollection() {
    let b = bridge(vec![light("Lamp", "lamp.on")]).await;

    b.store.insert("lamp.on", json!(true));
    b.manager.on_state_change("lamp.on", Some(json!(true))).await;
    b.manager.collect().await.unwrap();
    b.manager.on_state_change("lamp.on", Some(json!(true))).await;

    assert_eq!(b.change_reports().len(), 1);
}

#[tokio::test]
async fn physical_changes_are_rate_limited() {
    let b = bridge(vec![dimmer("Lamp", "lamp.level")]).await;

    for level in 1..=70 {
        b.store.insert("lamp.level", json!(level));
        b.manager.on_state_change("lamp.level", Some(json!(level))).await;
    }

    assert_eq!(b.change_reports().len(), 60);
}
