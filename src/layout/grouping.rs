use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pdf::extractor::PositionedRun;
use crate::pdf::geometry::BoundingBox;

/// Font size assumed when a run does not carry one
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Default baseline tolerance for line grouping, in points
pub const DEFAULT_LINE_TOLERANCE: f32 = 2.0;

/// A translatable unit made of one or more runs of a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSegment {
    pub runs: Vec<PositionedRun>,
    pub bbox: BoundingBox,
    pub font_size: f32,
    pub page: u32,
}

impl TextSegment {
    /// Build a segment from runs of a single page, `None` when `runs` is empty
    pub fn from_runs(runs: Vec<PositionedRun>) -> Option<Self> {
        let first = runs.first()?;
        let page = first.page;
        let font_size = first
            .font_size
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let bbox = runs
            .iter()
            .map(|r| BoundingBox::from_origin(r.x, r.y, r.width, r.height))
            .reduce(|acc, b| acc.union(&b))?;

        Some(Self {
            runs,
            bbox,
            font_size,
            page,
        })
    }

    /// Run texts joined with single spaces, in original order
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    /// Baseline origin of the first run
    pub fn origin(&self) -> (f32, f32) {
        self.runs.first().map_or((self.bbox.x0, self.bbox.y0), |r| (r.x, r.y))
    }
}

/// How runs are coalesced into segments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum GroupingStrategy {
    /// One segment per page
    #[default]
    Page,

    /// One segment per visual line
    Line {
        #[serde(default = "default_line_tolerance")]
        tolerance: f32,
    },

    /// One segment per run
    Run,
}

fn default_line_tolerance() -> f32 {
    DEFAULT_LINE_TOLERANCE
}

impl GroupingStrategy {
    /// Group runs into segments, pages ascending and arrival order kept within a page
    pub fn group(&self, runs: &[PositionedRun]) -> Vec<TextSegment> {
        let mut ordered: Vec<&PositionedRun> = runs.iter().collect();
        ordered.sort_by_key(|r| r.page);

        let mut segments = Vec::new();
        for page_runs in ordered.chunk_by(|a, b| a.page == b.page) {
            match self {
                Self::Page => segments.extend(TextSegment::from_runs(page_runs.iter().map(|r| (*r).clone()).collect())),
                Self::Run => segments.extend(page_runs.iter().filter_map(|r| TextSegment::from_runs(vec![(*r).clone()]))),
                Self::Line { tolerance } => {
                    let mut current: Vec<PositionedRun> = Vec::new();
                    for run in page_runs {
                        let same_line = current.first().is_some_and(|first| (run.y - first.y).abs() <= *tolerance);
                        if !same_line && !current.is_empty() {
                            segments.extend(TextSegment::from_runs(std::mem::take(&mut current)));
                        }
                        current.push((*run).clone());
                    }
                    segments.extend(TextSegment::from_runs(current));
                }
            }
        }

        segments
    }
}

impl fmt::Display for GroupingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Line { .. } => write!(f, "line"),
            Self::Run => write!(f, "run"),
        }
    }
}

impl FromStr for GroupingStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "page" => Ok(Self::Page),
            "line" => Ok(Self::Line {
                tolerance: DEFAULT_LINE_TOLERANCE,
            }),
            "run" => Ok(Self::Run),
            _ => Err(anyhow::anyhow!("Invalid grouping strategy: {}", s)),
        }
    }
}
