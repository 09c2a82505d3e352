// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewerk OCR pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PageError;

/// Stable identifier of a page: its 0-based position in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub usize);

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {}", self.0)
    }
}

/// Where the raw bytes of a page come from.
#[derive(Clone)]
pub enum PageSource {
    /// An image file on disk.
    Path(PathBuf),
    /// An encoded image already held in memory (PNG, JPEG, TIFF, ...).
    Bytes(Arc<Vec<u8>>),
}

impl PageSource {
    /// Short human-readable description for log fields.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl std::fmt::Debug for PageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
        }
    }
}

impl From<PathBuf> for PageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for PageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Arc::new(bytes))
    }
}

/// How the page was captured, if the host knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHint {
    Scanner,
    Camera,
    Unknown,
}

/// Coarse quality judgement supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityHint {
    Good,
    Poor,
}

/// Optional hints and measured diagnostics used for automatic profile
/// selection. Everything is optional; an empty value resolves to `Scanner`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub source_hint: Option<SourceHint>,
    pub quality_hint: Option<QualityHint>,
    /// Standard deviation of the high-frequency residual.
    pub noise_score: Option<f64>,
    /// Variance of the Laplacian; low values mean a blurry page.
    pub blur_score: Option<f64>,
    /// Standard deviation of the heavily blurred page (illumination unevenness).
    pub background_variance: Option<f64>,
    pub long_side_px: Option<u32>,
    /// Page is already (almost) pure black and white.
    pub looks_binary: Option<bool>,
}

/// Lifecycle states of a page within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageStatus {
    /// Waiting to be picked up by a worker.
    Pending,
    Preprocessing,
    Recognizing,
    /// At least one language produced text.
    Done,
    /// Preprocessing failed, or every language failed OCR.
    Failed,
    Cancelled,
}

impl PageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_transition_to(&self, next: PageStatus) -> bool {
        use PageStatus::*;
        matches!(
            (self, next),
            (Pending, Preprocessing)
                | (Preprocessing, Recognizing)
                | (Recognizing, Done)
                | (Preprocessing | Recognizing, Failed)
                | (Pending | Preprocessing | Recognizing, Cancelled)
        )
    }
}

/// An OCR language identifier such as `eng` or `deu`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(pub String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of recognising one page in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageOutcome {
    Recognized { text: String, attempts: u32 },
    Failed { error: PageError, attempts: u32 },
}

impl LanguageOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Recognized { text, .. } => Some(text),
            Self::Failed { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Recognized { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// One input page and everything the pipeline learned about it.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: PageId,
    pub source: PageSource,
    pub metadata: PageMetadata,
    /// Profile the page was preprocessed with, once resolved.
    pub profile: Option<ProfileName>,
    pub status: PageStatus,
    pub recognized: BTreeMap<LanguageCode, LanguageOutcome>,
    pub error: Option<PageError>,
}

impl Page {
    pub fn new(id: PageId, source: PageSource, metadata: PageMetadata) -> Self {
        Self {
            id,
            source,
            metadata,
            profile: None,
            status: PageStatus::Pending,
            recognized: BTreeMap::new(),
            error: None,
        }
    }

    pub fn text_for(&self, language: &LanguageCode) -> Option<&str> {
        self.recognized.get(language).and_then(LanguageOutcome::text)
    }

    /// Text in the first language of `preference` that succeeded, falling
    /// back to any successful language.
    pub fn preferred_text(&self, preference: &[LanguageCode]) -> Option<&str> {
        preference
            .iter()
            .find_map(|lang| self.text_for(lang))
            .or_else(|| self.recognized.values().find_map(LanguageOutcome::text))
    }
}

/// An ordered collection of pages plus the typography used when assembling.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub pages: Vec<Page>,
    pub typography: TypographySettings,
}

impl Document {
    pub fn new(typography: TypographySettings) -> Self {
        Self {
            pages: Vec::new(),
            typography,
        }
    }

    /// Build a document from sources, in the order given.
    pub fn from_sources(sources: Vec<PageSource>) -> Self {
        let mut doc = Self::default();
        for source in sources {
            doc.push(source, PageMetadata::default());
        }
        doc
    }

    /// Append a page and return its stable id.
    pub fn push(&mut self, source: PageSource, metadata: PageMetadata) -> PageId {
        let id = PageId(self.pages.len());
        self.pages.push(Page::new(id, source, metadata));
        id
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id.0)
    }

    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

// -- Execution settings -------------------------------------------------------

/// Who may edit preprocessing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlLevel {
    /// Profile selection only.
    #[default]
    Standard,
    /// Profile selection plus per-stage parameter editing.
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Parallel across pages, sized to the machine.
    #[default]
    Automatic,
    /// One worker, strict document order.
    Sequential,
}

/// Data-mode setting as configured by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataModeSetting {
    #[default]
    Automatic,
    MemoryOnly,
    DiskAssisted,
}

/// Data mode chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    /// Intermediate images stay in RAM.
    MemoryOnly,
    /// Preprocessed images are spilled to temporary files before OCR.
    DiskAssisted,
}

// -- Typography ---------------------------------------------------------------

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top_mm: f32,
    pub bottom_mm: f32,
    pub left_mm: f32,
    pub right_mm: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top_mm: 20.0,
            bottom_mm: 15.0,
            left_mm: 20.0,
            right_mm: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Right,
    Center,
    #[default]
    Justify,
}

/// How recognised lines are grouped into paragraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphPolicy {
    /// Every non-blank line is its own paragraph.
    LinePerParagraph,
    /// Consecutive non-blank lines form one paragraph.
    #[default]
    BlankLineSeparated,
}

/// Document-wide layout and paragraph style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypographySettings {
    pub paper_size: PaperSize,
    pub margins: Margins,
    pub font_family: String,
    pub font_size_pt: f32,
    pub alignment: Alignment,
    /// Line height as a percentage of the font size.
    pub line_height_percent: u32,
    pub first_line_indent_mm: f32,
    pub spacing_after_pt: f32,
    /// Longest run of blank lines kept between paragraphs.
    pub max_empty_lines: usize,
    pub insert_page_break_between_pages: bool,
    pub paragraph_policy: ParagraphPolicy,
    /// Keep line breaks inside a paragraph instead of joining with spaces.
    pub preserve_line_breaks: bool,
}

impl Default for TypographySettings {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            margins: Margins::default(),
            font_family: "Times New Roman".into(),
            font_size_pt: 12.0,
            alignment: Alignment::Justify,
            line_height_percent: 120,
            first_line_indent_mm: 10.0,
            spacing_after_pt: 6.0,
            max_empty_lines: 1,
            insert_page_break_between_pages: true,
            paragraph_policy: ParagraphPolicy::BlankLineSeparated,
            preserve_line_breaks: false,
        }
    }
}

// -- Preprocessing profiles ---------------------------------------------------

/// The six preprocessing stages, declared in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    ShadowRemoval,
    BackgroundNormalization,
    GaussianBlur,
    Clahe,
    Sharpen,
    AdaptiveThreshold,
}

impl StageId {
    /// Every stage in canonical pipeline order.
    pub const ALL: [StageId; 6] = [
        Self::ShadowRemoval,
        Self::BackgroundNormalization,
        Self::GaussianBlur,
        Self::Clahe,
        Self::Sharpen,
        Self::AdaptiveThreshold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShadowRemoval => "shadow_removal",
            Self::BackgroundNormalization => "background_normalization",
            Self::GaussianBlur => "gaussian_blur",
            Self::Clahe => "clahe",
            Self::Sharpen => "sharpen",
            Self::AdaptiveThreshold => "adaptive_threshold",
        }
    }

    /// Position in the canonical order.
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stage parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats; booleans never do.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Configuration of one stage inside a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub id: StageId,
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl StageConfig {
    pub fn new(id: StageId, enabled: bool) -> Self {
        Self {
            id,
            enabled,
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn with(mut self, field: &str, value: ParamValue) -> Self {
        self.params.insert(field.to_string(), value);
        self
    }

    pub fn param(&self, field: &str) -> Option<ParamValue> {
        self.params.get(field).copied()
    }
}

/// Name of a preprocessing profile. Built-ins serialise as fixed keywords;
/// anything else is a user-defined custom profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ProfileName {
    MobilePhoto,
    Scanner,
    LowQuality,
    /// Resolve per page from metadata.
    Automatic,
    Custom(String),
}

impl ProfileName {
    /// The three concrete built-in profiles.
    pub const BUILT_INS: [ProfileName; 3] =
        [Self::MobilePhoto, Self::Scanner, Self::LowQuality];

    pub fn is_built_in(&self) -> bool {
        matches!(self, Self::MobilePhoto | Self::Scanner | Self::LowQuality)
    }
}

impl std::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MobilePhoto => f.write_str("mobile"),
            Self::Scanner => f.write_str("scanner"),
            Self::LowQuality => f.write_str("low_quality"),
            Self::Automatic => f.write_str("automatic"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

impl FromStr for ProfileName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "mobile" => Self::MobilePhoto,
            "scanner" => Self::Scanner,
            "low_quality" => Self::LowQuality,
            "automatic" => Self::Automatic,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl From<String> for ProfileName {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(name) => name,
            Err(never) => match never {},
        }
    }
}

impl From<ProfileName> for String {
    fn from(name: ProfileName) -> Self {
        name.to_string()
    }
}

/// An ordered list of stage configurations under a name. Edits produce a new
/// value with a higher `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingProfile {
    pub name: ProfileName,
    pub version: u32,
    pub stages: Vec<StageConfig>,
}

impl PreprocessingProfile {
    /// Normalise any subset of stages into a full profile in canonical order.
    /// Missing stages are added disabled with default parameters; a stage
    /// listed twice is rejected.
    pub fn from_stages(
        name: ProfileName,
        version: u32,
        stages: Vec<StageConfig>,
    ) -> crate::Result<Self> {
        let mut slots: [Option<StageConfig>; 6] = Default::default();
        for stage in stages {
            let slot = &mut slots[stage.id.position()];
            if slot.is_some() {
                return Err(crate::PipelineError::StageOrder(format!(
                    "stage {} listed more than once",
                    stage.id
                )));
            }
            *slot = Some(stage);
        }
        let stages = StageId::ALL
            .iter()
            .zip(slots)
            .map(|(id, slot)| slot.unwrap_or_else(|| StageConfig::new(*id, false)))
            .collect();
        Ok(Self {
            name,
            version,
            stages,
        })
    }

    /// Whether the stage list is complete and in canonical order.
    pub fn is_canonical(&self) -> bool {
        self.stages.len() == StageId::ALL.len()
            && self.stages.iter().zip(StageId::ALL).all(|(s, id)| s.id == id)
    }

    pub fn stage(&self, id: StageId) -> Option<&StageConfig> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn stage_mut(&mut self, id: StageId) -> Option<&mut StageConfig> {
        self.stages.iter_mut().find(|s| s.id == id)
    }

    /// Stages that will actually run.
    pub fn enabled_stages(&self) -> impl Iterator<Item = &StageConfig> {
        self.stages.iter().filter(|s| s.enabled)
    }
}
