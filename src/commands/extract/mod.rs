use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cli::{ExtractArgs, OcrMode, default_db_path};
use crate::commands::inventory;
use crate::model::{
    ExtractCounts, ExtractPaths, ExtractRunManifest, PageInventoryManifest, PageReport,
    PageReportManifest, PageStatus, ToolVersions,
};
use crate::util::{
    ensure_directory, ensure_parent_directory, now_utc_string, read_json, utc_compact_string,
    write_json_pretty,
};

pub const DB_SCHEMA_VERSION: &str = "0.2.0";

mod dedupe;
mod hierarchy;
mod line_parse;
mod ocr_tools;
mod pipeline;
mod run;
mod store;
#[cfg(test)]
mod tests;

pub use run::run;

use dedupe::*;
use hierarchy::*;
use line_parse::*;
use ocr_tools::*;
use pipeline::*;
use store::*;
