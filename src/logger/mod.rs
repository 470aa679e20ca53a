//! Logger module
//!
//! Provides logging utilities for the greeter server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Object activation logging
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info log (shares the access log sink)
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, api_addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Greeter server started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Management API on: http://{api_addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if config.objects.idle_timeout > 0 {
        write_info(&format!("Object idle timeout: {}s", config.objects.idle_timeout));
    }
    match config.objects.storage_dir {
        Some(ref dir) => write_info(&format!("Object storage: {dir}")),
        None => write_info("Object storage: in-memory"),
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_info(message: &str) {
    write_info(message);
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_object_created(name: &str, id: &str) {
    write_info(&format!("[Objects] Activated {name} ({id})"));
}

pub fn log_object_evicted(name: &str, id: &str) {
    write_info(&format!("[Objects] Evicted idle {name} ({id})"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_api_error(message: &str) {
    write_error(&format!("[API ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_api_request(method: &str, path: &str, status: u16) {
    write_info(&format!("[API] {method} {path} - {status}"));
}

pub fn log_shutdown_started() {
    write_info("\n[Shutdown] Listeners closed, stopping objects");
}

pub fn log_shutdown_complete() {
    write_info("[Shutdown] ✓ All objects stopped, exiting");
}
