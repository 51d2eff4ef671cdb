//! Protocol Checker CLI
//!
//! Validates JSON payloads against the dashboard's wire types and probes a
//! running server with the same data-access code the browser uses.
//!
//! Usage:
//!   protocol_checker validate <type> <json-file>
//!   protocol_checker validate <type> --stdin
//!   protocol_checker list-types
//!   protocol_checker generate-example <type>
//!   protocol_checker probe <id> <L> <T> <Ti> [location] [time] [end_time]
//!   protocol_checker version
//!
//! Types: create-request, create-response, delete-request, order-update,
//!        data-response, representation-record
//!
//! `probe` reads its server address, token and session cookie from the
//! dashboard configuration (`DASHBOARD_BASE_URL`, `DASHBOARD_CSRF_TOKEN`,
//! `DASHBOARD_SESSION_COOKIE`).

// Dev tool - allow unwrap for CLI simplicity
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use anyhow::Context;
use serde_json::Value;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;
use std::rc::Rc;

use occupancy_dashboard::api::{CsrfToken, DataAccess, DataQuery, ReqwestClient};
use occupancy_dashboard::config::load_settings;
use occupancy_dashboard::model::{
    CreateRequest, CreateResponse, DataResponse, DeleteRequest, LocationId, LocationType,
    OrderEntry, RepresentationRecord, ThemeType, TimeType, WidgetDescriptor, WidgetId,
};

const SUPPORTED_TYPES: &[&str] = &[
    "create-request",
    "create-response",
    "delete-request",
    "order-update",
    "data-response",
    "representation-record",
];

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "validate" => {
            if args.len() < 3 {
                eprintln!("Error: Missing type argument");
                print_usage();
                process::exit(1);
            }
            let schema_type = &args[2];
            let json = if args.len() >= 4 {
                if args[3] == "--stdin" {
                    read_stdin()
                } else {
                    read_file(&args[3])
                }
            } else {
                read_stdin()
            };
            validate(schema_type, &json);
        }
        "list-types" => {
            println!("Supported schema types:");
            for t in SUPPORTED_TYPES {
                println!("  {}", t);
            }
        }
        "generate-example" => {
            if args.len() < 3 {
                eprintln!("Error: Missing type argument");
                print_usage();
                process::exit(1);
            }
            generate_example(&args[2]);
        }
        "probe" => {
            if args.len() < 6 {
                eprintln!("Error: probe needs <id> <L> <T> <Ti>");
                print_usage();
                process::exit(1);
            }
            if let Err(e) = probe(&args[2..]) {
                eprintln!("PROBE FAILED: {:#}", e);
                process::exit(1);
            }
        }
        "version" | "--version" | "-V" => {
            println!(
                "protocol_checker {} ({})",
                occupancy_dashboard::VERSION,
                occupancy_dashboard::GIT_SHA
            );
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Protocol Checker - Validate dashboard payloads and probe a server");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  protocol_checker validate <type> <json-file>");
    eprintln!("  protocol_checker validate <type> --stdin");
    eprintln!("  protocol_checker list-types");
    eprintln!("  protocol_checker generate-example <type>");
    eprintln!("  protocol_checker probe <id> <L> <T> <Ti> [location] [time] [end_time]");
    eprintln!("  protocol_checker version");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  protocol_checker validate create-response response.json");
    eprintln!("  echo '{{\"id\":4}}' | protocol_checker validate delete-request --stdin");
    eprintln!("  DASHBOARD_CSRF_TOKEN=... protocol_checker probe 7 W B N 2");
}

fn read_stdin() -> String {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .expect("Failed to read stdin");
    input
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    })
}

fn validate(schema_type: &str, json: &str) {
    // Syntax errors first, so they are not reported as schema mismatches
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("INVALID: JSON parse error: {}", e);
            process::exit(1);
        }
    };

    let result = match schema_type {
        "create-request" => serde_json::from_value::<CreateRequest>(value).map(|_| ()),
        "create-response" => serde_json::from_value::<CreateResponse>(value).map(|_| ()),
        "delete-request" => serde_json::from_value::<DeleteRequest>(value).map(|_| ()),
        "order-update" => serde_json::from_value::<Vec<OrderEntry>>(value).map(|_| ()),
        "data-response" => serde_json::from_value::<DataResponse>(value).map(|_| ()),
        "representation-record" => {
            serde_json::from_value::<RepresentationRecord>(value).map(|_| ())
        }
        _ => {
            eprintln!("Unknown schema type: {}", schema_type);
            eprintln!("Run 'protocol_checker list-types' to see supported types");
            process::exit(1);
        }
    };

    match result {
        Ok(()) => {
            println!("VALID: JSON conforms to '{}' schema", schema_type);
        }
        Err(e) => {
            eprintln!(
                "INVALID: Schema validation failed for '{}': {}",
                schema_type, e
            );
            process::exit(1);
        }
    }
}

fn generate_example(schema_type: &str) {
    let example: Value = match schema_type {
        "create-request" => serde_json::json!({
            "location_type": "W",
            "theme_type": "B",
            "time_type": "N"
        }),
        "create-response" => serde_json::json!({
            "data_representation": {
                "location_type": "W",
                "theme_type": "B",
                "time_type": "N"
            },
            "user_data_representation": {
                "id": 12,
                "order": 3,
                "time": null,
                "end_time": null,
                "ward": 2,
                "room": null
            },
            "locations": [
                { "id": 1, "name": "Station 1" },
                { "id": 2, "name": "Station 2" }
            ]
        }),
        "delete-request" => serde_json::json!({ "id": 12 }),
        "order-update" => serde_json::json!([
            { "id": "12", "order": 0 },
            { "id": "7", "order": 1 }
        ]),
        "data-response" => serde_json::json!({
            "data": {
                "sex": "W",
                "average_age": 64.5,
                "occupied": 2,
                "max": 4
            },
            "user_data_representation": {
                "id": 7,
                "order": 1,
                "time": "2024-01-05T10:00",
                "end_time": null,
                "ward": null,
                "room": 3
            }
        }),
        "representation-record" => serde_json::json!({
            "id": 7,
            "order": 1,
            "time": "2024-01-05T10:00",
            "end_time": "2024-01-06T10:00",
            "ward": 2,
            "room": null
        }),
        _ => {
            eprintln!("Unknown schema type: {}", schema_type);
            eprintln!("Run 'protocol_checker list-types' to see supported types");
            process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&example).unwrap());
}

/// Fetch one widget's data from a live server and print the response.
fn probe(args: &[String]) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "occupancy_dashboard=debug".into()),
        )
        .with_writer(io::stderr)
        .init();

    let settings = load_settings().context("loading settings")?;
    let csrf = CsrfToken::from_value(settings.csrf_token.clone(), "csrf_token")?;

    let location = LocationType::from_code(&args[1])?;
    let descriptor = WidgetDescriptor {
        id: WidgetId::new(args[0].as_str()),
        location,
        theme: ThemeType::from_code(&args[2])?,
        time_mode: TimeType::from_code(&args[3])?,
        selected_location: args.get(4).map(|id| LocationId::new(id.as_str())),
        time: args.get(5).cloned(),
        end_time: args.get(6).cloned(),
        order: 0,
    };
    let query = DataQuery::for_descriptor(&descriptor, false, false)?;

    let client = ReqwestClient::new()?.with_session_cookie(settings.session_cookie.clone());
    let api = DataAccess::new(
        Rc::new(client),
        settings.api_root(),
        settings.csrf_header.clone(),
        csrf,
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let response = runtime.block_on(api.fetch_widget_data(&query))?;

    tracing::info!(
        "Widget {} answered with {} location option(s)",
        descriptor.id,
        response.locations.as_ref().map_or(0, Vec::len)
    );
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
