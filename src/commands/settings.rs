use crate::models::portfolio::{
    EnteFilter, SortDirection, SortField, DEFAULT_POPULATION_MAX, DEFAULT_STOCK_RCL_MAX,
};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 1;
const DEFAULT_SEED_FILE: &str = "entes.json";

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub seed_file: PathBuf,
    pub strict_column_count: bool,
    pub default_filter: EnteFilter,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

pub async fn get_settings(data_dir: String) -> Result<Value, String> {
    load_settings_from_disk(&data_dir)
}

pub async fn save_settings(data_dir: String, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(&data_dir, settings)
}

pub fn load_effective_settings(data_dir: &str) -> Result<EffectiveSettings, String> {
    let settings = load_settings_from_disk(data_dir)?;

    let seed_raw = settings
        .get("seedFile")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SEED_FILE);
    let seed_path = PathBuf::from(seed_raw);
    let seed_file = if seed_path.is_absolute() {
        seed_path
    } else {
        Path::new(data_dir).join(seed_path)
    };

    let filters = &settings["filters"];
    let default_filter = EnteFilter {
        population_min: filters["populationMin"].as_u64().unwrap_or(0),
        population_max: filters["populationMax"]
            .as_u64()
            .unwrap_or(DEFAULT_POPULATION_MAX),
        stock_rcl_max: filters["stockRclMax"]
            .as_f64()
            .unwrap_or(DEFAULT_STOCK_RCL_MAX),
        ..EnteFilter::default()
    };

    let sort_field = settings["sort"]["field"]
        .as_str()
        .and_then(SortField::parse)
        .unwrap_or_default();
    let sort_direction = match settings["sort"]["direction"].as_str() {
        Some("desc") => SortDirection::Desc,
        _ => SortDirection::Asc,
    };

    Ok(EffectiveSettings {
        seed_file,
        strict_column_count: settings["strictColumnCount"].as_bool().unwrap_or(false),
        default_filter,
        sort_field,
        sort_direction,
    })
}

pub fn load_settings_from_disk(data_dir: &str) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_state_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is not valid JSON, falling back to defaults: {e}");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &str, settings: Value) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_state_dir(data_dir)?;

    let mut merged = load_settings_from_disk(data_dir).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    Ok(migrated)
}

fn settings_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir)
        .join(".precatorios")
        .join("settings.json")
}

fn ensure_state_dir(data_dir: &str) -> Result<(), String> {
    let dir = Path::new(data_dir).join(".precatorios");
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create .precatorios directory: {e}"))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "seedFile": DEFAULT_SEED_FILE,
        "strictColumnCount": false,
        "filters": {
            "populationMin": 0,
            "populationMax": DEFAULT_POPULATION_MAX,
            "stockRclMax": DEFAULT_STOCK_RCL_MAX
        },
        "sort": {
            "field": "name",
            "direction": "asc"
        }
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    let seed_valid = obj
        .get("seedFile")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !seed_valid {
        obj.insert("seedFile".to_string(), json!(DEFAULT_SEED_FILE));
    }
    ensure_bool(obj, "strictColumnCount", false);

    let mut filters = take_object(obj, "filters");
    clamp_u64(&mut filters, "populationMin", 0, DEFAULT_POPULATION_MAX, 0);
    clamp_u64(&mut filters, "populationMax", 0, u64::MAX, DEFAULT_POPULATION_MAX);
    let min = filters.get("populationMin").and_then(Value::as_u64).unwrap_or(0);
    let max = filters
        .get("populationMax")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_POPULATION_MAX);
    if max < min {
        filters.insert("populationMax".to_string(), json!(min));
    }
    clamp_f64(&mut filters, "stockRclMax", 0.0, 1_000.0, DEFAULT_STOCK_RCL_MAX);
    obj.insert("filters".to_string(), Value::Object(filters));

    let mut sort = take_object(obj, "sort");
    sanitize_enum(
        &mut sort,
        "field",
        &[
            "name",
            "state",
            "population",
            "revenue",
            "precatorio_debt",
            "stock_to_revenue",
            "grade",
        ],
        "name",
    );
    sanitize_enum(&mut sort, "direction", &["asc", "desc"], "asc");
    obj.insert("sort".to_string(), Value::Object(sort));
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn clamp_f64(map: &mut Map<String, Value>, key: &str, min: f64, max: f64, default: f64) {
    let raw = map
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn sanitize_enum(map: &mut Map<String, Value>, key: &str, allowed: &[&str], default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| allowed.contains(value))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(valid));
}

fn ensure_bool(map: &mut Map<String, Value>, key: &str, default: bool) {
    let value = map.get(key).and_then(Value::as_bool).unwrap_or(default);
    map.insert(key.to_string(), json!(value));
}
