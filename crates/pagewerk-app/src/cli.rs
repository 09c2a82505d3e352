// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pagewerk_core::{DataModeSetting, ParamValue, ProfileName, StageId};

#[derive(Debug, Parser)]
#[command(name = "pagewerk", version, about = "Preprocess, recognise and assemble scanned pages")]
pub struct Cli {
    /// Pipeline configuration (JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recognise page images and write the assembled text.
    Run(RunArgs),
    /// Inspect or edit preprocessing profiles.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Write a configuration file with every default spelled out.
    InitConfig {
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Page images, in document order.
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Plain-text output file.
    #[arg(short, long, default_value = "pagewerk.txt")]
    pub output: PathBuf,

    /// Also dump the document model as JSON.
    #[arg(long)]
    pub model_json: Option<PathBuf>,

    /// OCR languages in preference order (overrides config).
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Profile: mobile, scanner, low_quality, automatic or a custom name.
    #[arg(short, long)]
    pub profile: Option<ProfileName>,

    /// Process one page at a time, in order.
    #[arg(long)]
    pub sequential: bool,

    #[arg(long, value_enum)]
    pub data_mode: Option<DataModeArg>,

    /// Directory with OCR models (`text-detection.rten`, `text-recognition.rten`).
    #[arg(long)]
    pub models: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DataModeArg {
    Auto,
    Memory,
    Disk,
}

impl From<DataModeArg> for DataModeSetting {
    fn from(arg: DataModeArg) -> Self {
        match arg {
            DataModeArg::Auto => Self::Automatic,
            DataModeArg::Memory => Self::MemoryOnly,
            DataModeArg::Disk => Self::DiskAssisted,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Print a profile as JSON, including any stored override.
    Show { name: ProfileName },
    /// Change one stage parameter (professional control only).
    Set {
        name: ProfileName,
        #[arg(value_parser = parse_stage)]
        stage: StageId,
        field: String,
        #[arg(value_parser = parse_value)]
        value: ParamValue,
    },
    /// Turn a stage on or off (professional control only).
    Enable {
        name: ProfileName,
        #[arg(value_parser = parse_stage)]
        stage: StageId,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Drop the stored override of a built-in profile.
    Reset { name: ProfileName },
}

pub fn parse_stage(input: &str) -> Result<StageId, String> {
    StageId::ALL
        .into_iter()
        .find(|id| id.as_str() == input)
        .ok_or_else(|| {
            let names: Vec<_> = StageId::ALL.iter().map(StageId::as_str).collect();
            format!("unknown stage `{input}`; expected one of {}", names.join(", "))
        })
}

/// Integers first, then floats, then booleans.
pub fn parse_value(input: &str) -> Result<ParamValue, String> {
    if let Ok(v) = input.parse::<i64>() {
        return Ok(ParamValue::Int(v));
    }
    if let Ok(v) = input.parse::<f64>() {
        return Ok(ParamValue::Float(v));
    }
    if let Ok(v) = input.parse::<bool>() {
        return Ok(ParamValue::Bool(v));
    }
    Err(format!("`{input}` is not a number or boolean"))
}
