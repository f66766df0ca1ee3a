#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident risk API server binary.
//!
//! Pass `--interactive` to be prompted for the bind address, port and
//! model path before starting.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    if std::env::args().any(|arg| arg == "--interactive") {
        accident_risk_server::interactive::run().await
    } else {
        accident_risk_server::run_server().await
    }
}
