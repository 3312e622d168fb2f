// ─── InterfaceOficial Core ───
// Game launch engine for the InterfaceOficial launcher.
//
// Architecture:
//   core/
//     config/     Settings store with per-version overrides
//     version/    Version JSON, inheritance and library resolution
//     java/       Java requirements, discovery and runtime download
//     auth/       Offline, Microsoft and third-party server login
//     launch/     Arguments, natives, pre-run, process and watcher
//     pipeline/   Staged launch with progress and cancellation

pub mod abort;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod notify;
pub mod paths;
pub mod pipeline;
#[cfg(test)]
pub(crate) mod testing;
pub mod version;
