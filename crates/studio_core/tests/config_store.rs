use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use studio_core::{
    Config, ConfigError, ConfigKey, ConfigStore, KeyValueStorage, MemoryStorage, STORAGE_PREFIX,
};

fn init_logging() {
    studio_logging::initialize_for_tests();
}

#[test]
fn set_then_get_returns_coerced_values() {
    init_logging();
    let store = ConfigStore::new();

    store.set("apiKey", "sk-test").unwrap();
    store.set("maxImagesPerBatch", "4").unwrap();
    store.set("disableVision", false).unwrap();
    store.set("textModel", None::<String>).unwrap();

    let config = store.get();
    assert_eq!(config.api_key, "sk-test");
    assert_eq!(config.max_images_per_batch, "4");
    assert!(!config.disable_vision);
    assert_eq!(config.text_model, "");

    store.set("disableVision", "true").unwrap();
    assert!(store.get().disable_vision);
    store.set("imageQuality", true).unwrap();
    assert_eq!(store.get().image_quality, "true");
}

#[test]
fn unknown_key_is_rejected() {
    init_logging();
    let store = ConfigStore::new();
    let before = store.get();

    let err = store.set("apiSecret", "x").unwrap_err();

    assert_eq!(err, ConfigError::UnknownKey("apiSecret".to_string()));
    assert_eq!(store.get(), before);
}

#[test]
fn get_returns_an_independent_copy() {
    let store = ConfigStore::new();
    let mut copy = store.get();
    copy.api_key = "mutated".to_string();

    assert_eq!(store.get().api_key, "");
}

#[test]
fn persist_writes_non_empty_fields_and_removes_empty_ones() {
    init_logging();
    let mut storage = MemoryStorage::new();
    storage
        .set_item(&format!("{STORAGE_PREFIX}baseUrl"), "https://stale")
        .unwrap();

    let store = ConfigStore::new();
    store.set("apiKey", "sk-1").unwrap();
    store.set("baseUrl", "").unwrap();
    store.set("imageQuality", "").unwrap();
    store.persist(&mut storage).unwrap();

    assert_eq!(storage.get_item("tc_agent.apiKey").as_deref(), Some("sk-1"));
    assert_eq!(storage.get_item("tc_agent.baseUrl"), None);
    assert_eq!(storage.get_item("tc_agent.imageQuality"), None);
    assert_eq!(
        storage.get_item("tc_agent.disableVision").as_deref(),
        Some("true")
    );
    assert_eq!(
        storage.get_item("tc_agent.maxSectionChars").as_deref(),
        Some("60000")
    );
}

#[test]
fn mutation_alone_does_not_persist() {
    let storage = MemoryStorage::new();
    let store = ConfigStore::load(&storage);
    store.set("apiKey", "sk-unsaved").unwrap();

    assert!(storage.is_empty());
}

#[test]
fn persist_then_reload_restores_visible_config() {
    init_logging();
    let mut storage = MemoryStorage::new();
    let store = ConfigStore::new();
    store.set("apiKey", "sk-2").unwrap();
    store.set("textModel", "gpt-test").unwrap();
    store.set("disableVision", false).unwrap();
    store.set("maxImagesPerBatch", "3").unwrap();
    // Empty fields are dropped and come back as built-in defaults.
    store.set("imageMaxSize", "").unwrap();
    store.persist(&mut storage).unwrap();

    let reloaded = ConfigStore::load(&storage).get();

    let expected = Config {
        api_key: "sk-2".to_string(),
        text_model: "gpt-test".to_string(),
        disable_vision: false,
        max_images_per_batch: "3".to_string(),
        ..Config::default()
    };
    assert_eq!(reloaded, expected);
    assert_eq!(reloaded.image_max_size, "1024");
}

#[test]
fn load_keeps_defaults_for_missing_keys() {
    let mut storage = MemoryStorage::new();
    storage.set_item("tc_agent.visionModel", "vl-1").unwrap();
    storage.set_item("tc_agent.disableVision", "false").unwrap();
    storage.set_item("other.apiKey", "ignored").unwrap();

    let config = ConfigStore::load(&storage).get();

    assert_eq!(config.vision_model, "vl-1");
    assert!(!config.disable_vision);
    assert_eq!(config.api_key, "");
    assert_eq!(config.image_quality, "85");
}

#[test]
fn subscribe_replays_current_state_then_follows_changes() {
    init_logging();
    let store = ConfigStore::new();
    store.set("apiKey", "first").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = store.subscribe(move |config| {
        sink.lock().unwrap().push(config.api_key.clone());
    });

    store.set("apiKey", "second").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);

    subscription.unsubscribe();
    store.set("apiKey", "third").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn handlers_may_read_the_store_during_notification() {
    let store = ConfigStore::new();
    let reader = store.clone();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    let _subscription = store.subscribe(move |_| {
        sink.lock().unwrap().push(reader.get().text_model);
    });

    store.set("textModel", "m1").unwrap();

    assert_eq!(*observed.lock().unwrap(), vec!["", "m1"]);
}

#[test]
fn payload_omits_empty_fields_and_parses_numbers() {
    init_logging();
    let store = ConfigStore::new();
    store.set("apiKey", "sk-3").unwrap();
    store.set("maxImagesPerBatch", "10").unwrap();
    store.set("imageMaxSize", "").unwrap();
    store.set("imageQuality", "high").unwrap();

    let payload = store.build_request_payload();
    assert_eq!(payload.api_key.as_deref(), Some("sk-3"));
    assert_eq!(payload.max_images_per_batch, Some(10));
    assert_eq!(payload.image_max_size, None);
    assert_eq!(payload.image_quality, None);
    assert_eq!(payload.max_section_chars, Some(60000));
    assert!(payload.disable_vision);

    let json = serde_json::to_value(&payload).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object["api_key"], "sk-3");
    assert_eq!(object["max_images_per_batch"], 10);
    assert_eq!(object["disable_vision"], true);
    for absent in ["base_url", "text_model", "vision_model", "image_max_size", "image_quality"] {
        assert!(!object.contains_key(absent), "{absent} should be absent");
    }
    assert!(object.values().all(|value| value != ""));
}

#[test]
fn every_numeric_key_maps_to_its_wire_name() {
    let store = ConfigStore::new();
    for key in ConfigKey::ALL.into_iter().filter(|key| key.is_numeric()) {
        store.set_key(key, "7");
    }

    let json = serde_json::to_value(store.build_request_payload()).unwrap();
    for key in ConfigKey::ALL.into_iter().filter(|key| key.is_numeric()) {
        assert_eq!(json[key.wire_name()], 7, "{key}");
    }
}
