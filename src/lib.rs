// Library root
// -----------
// Bulk uploader for the Cloudinary asset hosting service. The binary
// (`main.rs`) wires these modules together; they are usable on their own.
//
// Module responsibilities:
// - `config`: merges CLI values, the JSON config file and environment
//   variables into one `EffectiveConfig`.
// - `enumerate`: walks directories and filters files by extension.
// - `upload`: request/outcome types and the executor that runs a batch.
// - `api`: the signed HTTP call to the Cloudinary upload endpoint.
// - `report`: grouped and plain report files.
// - `ui`: progress bar, console summary and credential prompts.
// - `cli`: command-line arguments.
pub mod api;
pub mod cli;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod report;
pub mod ui;
pub mod upload;
