use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use toldo_cli::commands::{config, installments, quote, search, transition};

#[test]
fn quote_prices_area_and_accessory_items_into_one_installment() {
    with_env(&[("TOLDO_QUOTING_ID_PREFIX", "cli")], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(&dir, "visit.json", &quote_document(json!(["i1", "i2"])));

        let result = quote::run(&input);
        assert_eq!(result.exit_code, 0, "expected quote success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["status"], "ok");

        let quote = &payload["data"]["quote"];
        assert_eq!(quote["status"], "draft");
        assert_eq!(quote["id"], "cli-quote-1");
        assert_eq!(decimal(&quote["pricing"]["total"]), Decimal::new(180, 0));
        assert_eq!(quote["installments"]["count"], 1);
        assert_eq!(quote["items"].as_array().map(Vec::len), Some(2));

        let groups = payload["data"]["groups"].as_array().expect("groups array");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["root"], "i1");
        assert_eq!(groups[0]["accessories"], json!(["i2"]));
    });
}

#[test]
fn quote_includes_historical_items_as_fresh_ungrouped_clones() {
    with_env(&[("TOLDO_QUOTING_ID_PREFIX", "cli")], || {
        let dir = TempDir::new().expect("temp dir");
        let mut document = quote_document(json!(["i1"]));
        document["history"] = json!([{
            "id": "old-sheet",
            "label": "Visita de março",
            "created_at": "2026-03-02T14:00:00Z",
            "items": [
                {"id": "h1", "environment": "Quarto", "product_id": "p1",
                 "width": "1", "height": "2"},
                {"id": "h2", "environment": "Quarto", "product_id": "p2", "parent_item_id": "h1"}
            ]
        }]);
        document["selections"]["historical"] = json!({"old-sheet": ["h2"]});
        let input = write_json(&dir, "visit.json", &document);

        let result = quote::run(&input);
        assert_eq!(result.exit_code, 0, "expected quote success: {}", result.output);

        let items = parse_payload(&result.output)["data"]["quote"]["items"].clone();
        let items = items.as_array().expect("items array").clone();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "i1");
        assert_eq!(items[1]["id"], "cli-item-1");
        assert_eq!(items[1]["parent_item_id"], Value::Null);
    });
}

#[test]
fn quote_with_nothing_selected_reports_empty_selection() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(&dir, "visit.json", &quote_document(json!([])));

        let result = quote::run(&input);
        assert_eq!(result.exit_code, 3, "expected empty selection exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "empty_selection");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("Select at least one item"));
        assert!(message.contains("correlation_id=sheet:s1"));
    });
}

#[test]
fn quote_rejects_unknown_products_as_bad_request() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let mut document = quote_document(json!(["i1"]));
        document["sheet"]["items"][0]["product_id"] = json!("discontinued");
        let input = write_json(&dir, "visit.json", &document);

        let result = quote::run(&input);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "bad_request");
        assert!(payload["message"].as_str().unwrap_or_default().contains("discontinued"));
    });
}

#[test]
fn quote_rejects_documents_with_looping_accessories() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let mut document = quote_document(json!(["i1", "i2"]));
        document["sheet"]["items"][0]["product_id"] = json!("p2");
        document["sheet"]["items"][0]["parent_item_id"] = json!("i2");
        let input = write_json(&dir, "visit.json", &document);

        let result = quote::run(&input);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "bad_request");
        assert!(payload["message"].as_str().unwrap_or_default().contains("cycle"));
    });
}

#[test]
fn quote_reports_unreadable_documents() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = dir.path().join("broken.json");
        fs::write(&input, "{ not json").expect("write input");

        let result = quote::run(&input);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "input_parse");

        let missing = quote::run(&dir.path().join("missing.json"));
        assert_eq!(missing.exit_code, 2);
        assert_eq!(parse_payload(&missing.output)["error_class"], "input_parse");
    });
}

#[test]
fn quote_fails_fast_on_invalid_configuration() {
    with_env(&[("TOLDO_QUOTING_CURRENCY", "reais")], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(&dir, "visit.json", &quote_document(json!(["i1"])));

        let result = quote::run(&input);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn transition_moves_a_generated_quote_through_its_lifecycle() {
    with_env(&[("TOLDO_QUOTING_ID_PREFIX", "cli")], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(&dir, "visit.json", &quote_document(json!(["i1"])));
        let generated = parse_payload(&quote::run(&input).output)["data"]["quote"].clone();
        let draft = write_json(&dir, "quote.json", &generated);

        let sent = transition::run(&draft, "sent");
        assert_eq!(sent.exit_code, 0, "expected transition success: {}", sent.output);
        let sent_payload = parse_payload(&sent.output);
        assert_eq!(sent_payload["data"]["status"], "sent");
        assert_eq!(sent_payload["data"]["id"], generated["id"]);

        let skipped = parse_payload(&transition::run(&draft, "approved").output);
        assert_eq!(skipped["error_class"], "bad_request");
        let message = skipped["message"].as_str().unwrap_or_default();
        assert!(message.contains("from draft to approved"));
        assert!(message.contains("correlation_id=quote:cli-quote-1"));

        let unknown = transition::run(&draft, "shipped");
        assert_eq!(unknown.exit_code, 2);
        assert!(parse_payload(&unknown.output)["message"]
            .as_str()
            .unwrap_or_default()
            .contains("unknown quote status `shipped`"));
    });
}

#[test]
fn search_ignores_accents_and_case() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let catalog = write_json(&dir, "catalog.json", &catalog_json());
        let customers = write_json(
            &dir,
            "customers.json",
            &json!([
                {"id": "c1", "name": "José Antônio", "city": "São Paulo"},
                {"id": "c2", "name": "Maria Lima", "document": "123.456.789-00"}
            ]),
        );

        let result = search::run(&catalog, Some(&customers), "SAO");
        assert_eq!(result.exit_code, 0);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["products"].as_array().map(Vec::len), Some(0));
        assert_eq!(payload["data"]["customers"][0]["id"], "c1");

        let result = search::run(&catalog, None, "bando");
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["products"][0]["id"], "p2");
        assert!(payload["data"].get("customers").is_none());

        let everything = parse_payload(&search::run(&catalog, None, "").output);
        assert_eq!(everything["data"]["products"].as_array().map(Vec::len), Some(2));
    });
}

#[test]
fn installments_use_flags_over_configured_limits() {
    with_env(&[("TOLDO_QUOTING_MAX_INSTALLMENTS", "6")], || {
        let configured = installments::run(Decimal::new(9_000, 0), None, None);
        let configured = parse_payload(&configured.output);
        assert_eq!(configured["data"]["count"], 6);
        assert_eq!(configured["data"]["max_installments"], 6);

        let flagged =
            installments::run(Decimal::new(1_000, 0), Some(Decimal::new(250, 0)), Some(12));
        let flagged = parse_payload(&flagged.output);
        assert_eq!(flagged["data"]["count"], 4);
        assert_eq!(decimal(&flagged["data"]["per_installment"]), Decimal::new(250, 0));
        assert!(flagged["message"].as_str().unwrap_or_default().starts_with("4x 250"));
    });
}

#[test]
fn installments_reject_invalid_limits() {
    with_env(&[], || {
        let result = installments::run(Decimal::new(1_000, 0), Some(Decimal::ZERO), None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn config_reports_sources() {
    with_env(&[("TOLDO_LOG_LEVEL", "debug")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let entries = payload["data"].as_array().expect("config entries");
        let entry = |key: &str| {
            entries.iter().find(|entry| entry["key"] == key).cloned().unwrap_or(Value::Null)
        };

        assert_eq!(entry("logging.level")["value"], "debug");
        assert_eq!(entry("logging.level")["source"], "env (TOLDO_LOG_LEVEL)");
        assert_eq!(entry("quoting.currency")["value"], "BRL");
        assert_eq!(entry("quoting.currency")["source"], "default");
    });
}

fn catalog_json() -> Value {
    json!([
        {"id": "p1", "name": "Toldo Cortina", "category": "Toldos",
         "unit_price": "80", "pricing_unit": "PER_AREA"},
        {"id": "p2", "name": "Bandô", "category": "Acessórios",
         "unit_price": "20", "pricing_unit": "PER_UNIT", "accessory": true}
    ])
}

fn quote_document(selected: Value) -> Value {
    json!({
        "catalog": catalog_json(),
        "sheet": {
            "id": "s1",
            "label": "Visita",
            "created_at": "2026-10-01T12:00:00Z",
            "items": [
                {"id": "i1", "environment": "Varanda", "product_id": "p1",
                 "width": "2", "height": "1", "quantity": "1"},
                {"id": "i2", "environment": "Varanda", "product_id": "p2",
                 "quantity": "1", "parent_item_id": "i1"}
            ]
        },
        "history": [],
        "selections": {"current": selected}
    })
}

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, value.to_string()).expect("write json fixture");
    path
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().and_then(|raw| raw.parse().ok()).expect("decimal string")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TOLDO_QUOTING_CURRENCY",
        "TOLDO_QUOTING_MIN_INSTALLMENT",
        "TOLDO_QUOTING_MAX_INSTALLMENTS",
        "TOLDO_QUOTING_ID_PREFIX",
        "TOLDO_LOGGING_LEVEL",
        "TOLDO_LOGGING_FORMAT",
        "TOLDO_LOG_LEVEL",
        "TOLDO_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
