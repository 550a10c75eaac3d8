use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::models::{RatingEntry, Submission};

pub const HEADER: &str = "Name,UserCulture,Video,Rating,Time,StimCulture,StimEmotion,StimIndex,URL\n";

static STIMULUS_RE: OnceLock<Regex> = OnceLock::new();

fn stimulus_re() -> &'static Regex {
    STIMULUS_RE.get_or_init(|| {
        Regex::new(r"(?i)^(.+?)_([A-Za-z]+)_(\d+)\.[^.]+$").expect("stimulus filename pattern")
    })
}

/// Metadata carried in a clip filename of the form `{culture}_{emotion}_{index}.{ext}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stimulus {
    pub culture: String,
    pub emotion: String,
    pub index: String,
    pub filename: String,
    pub normalized_url: String,
}

pub fn parse_stimulus(url: &str) -> Stimulus {
    let normalized_url = url.replace('\\', "/");
    let filename = normalized_url.rsplit('/').next().unwrap_or("").to_string();

    let (culture, emotion, index) = match stimulus_re().captures(&filename) {
        Some(caps) => (
            caps[1].to_string(),
            caps[2].to_string(),
            caps[3].to_string(),
        ),
        None => Default::default(),
    };

    Stimulus {
        culture,
        emotion,
        index,
        filename,
        normalized_url,
    }
}

pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn encode_row(submission: &Submission, entry: &RatingEntry) -> String {
    let stimulus = parse_stimulus(&entry.url);
    let time = entry.time.clone().unwrap_or_else(now_timestamp);

    [
        submission.user.name.as_str(),
        submission.user.culture.as_str(),
        entry.video.as_str(),
        entry.rating.as_str(),
        time.as_str(),
        stimulus.culture.as_str(),
        stimulus.emotion.as_str(),
        stimulus.index.as_str(),
        stimulus.normalized_url.as_str(),
    ]
    .iter()
    .map(|field| csv_escape(field))
    .collect::<Vec<_>>()
    .join(",")
}

/// One CSV line per rating, in submission order, without line terminators.
pub fn encode_rows(submission: &Submission) -> Vec<String> {
    submission
        .ratings
        .iter()
        .map(|entry| {
            if entry.emotion().is_none() {
                tracing::warn!(
                    "Unrecognised rating label {:?} for video {:?}",
                    entry.rating,
                    entry.video
                );
            }
            encode_row(submission, entry)
        })
        .collect()
}

/// Joins rows into the text appended to the results file.
pub fn append_block(rows: &[String]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut block = rows.join("\n");
    block.push('\n');
    block
}
