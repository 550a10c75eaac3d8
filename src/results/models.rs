use serde_json::Value;
use thiserror::Error;

/// Emotion labels offered to participants on the rating screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Anger,
    Happiness,
    Neutral,
    Sadness,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Anger,
        Emotion::Happiness,
        Emotion::Neutral,
        Emotion::Sadness,
        Emotion::Surprise,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Anger => "Anger",
            Emotion::Happiness => "Happiness",
            Emotion::Neutral => "Neutral",
            Emotion::Sadness => "Sadness",
            Emotion::Surprise => "Surprise",
        }
    }

    pub fn from_label(label: &str) -> Option<Emotion> {
        Self::ALL.into_iter().find(|e| e.label() == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub culture: String,
}

/// One rated clip. Fields are kept as the raw text the client sent so that a
/// sloppy entry still produces a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingEntry {
    pub video: String,
    pub url: String,
    pub rating: String,
    pub time: Option<String>,
}

impl RatingEntry {
    pub fn emotion(&self) -> Option<Emotion> {
        Emotion::from_label(&self.rating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user: Participant,
    pub ratings: Vec<RatingEntry>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Missing user {{name,culture}} or ratings[]")]
    MissingFields,
}

impl Submission {
    /// Shape check of an untrusted submission body.
    ///
    /// Only the participant fields and the `ratings` array are required;
    /// everything inside a rating entry is optional and degrades to an empty
    /// string.
    pub fn from_json(body: &Value) -> Result<Submission, SubmissionError> {
        let user = body.get("user").ok_or(SubmissionError::MissingFields)?;
        let name = required_text(user.get("name"))?;
        let culture = required_text(user.get("culture"))?;

        let ratings = body
            .get("ratings")
            .and_then(Value::as_array)
            .ok_or(SubmissionError::MissingFields)?
            .iter()
            .map(|entry| RatingEntry {
                video: value_text(entry.get("video")),
                url: value_text(entry.get("url")),
                rating: value_text(entry.get("rating")),
                time: entry
                    .get("time")
                    .filter(|t| !t.is_null())
                    .map(|t| value_text(Some(t))),
            })
            .collect();

        Ok(Submission {
            user: Participant { name, culture },
            ratings,
        })
    }
}

fn required_text(value: Option<&Value>) -> Result<String, SubmissionError> {
    let text = value_text(value);
    if text.is_empty() {
        return Err(SubmissionError::MissingFields);
    }
    Ok(text)
}

/// Text form of a loosely typed JSON field: strings verbatim, `null` and
/// missing as empty, anything else as its JSON text.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_submission() {
        let body = json!({
            "user": {"name": "Ana", "culture": "Chilean"},
            "ratings": [
                {"video": "clip1", "url": "/v/chile_anger_1.mp4", "rating": "Anger", "time": "2026-10-19T08:30:00.000Z"},
                {"video": "clip2", "url": "/v/chile_happiness_2.mp4", "rating": "Happiness"}
            ]
        });

        let submission = Submission::from_json(&body).unwrap();
        assert_eq!(submission.user.name, "Ana");
        assert_eq!(submission.user.culture, "Chilean");
        assert_eq!(submission.ratings.len(), 2);
        assert_eq!(
            submission.ratings[0].time.as_deref(),
            Some("2026-10-19T08:30:00.000Z")
        );
        assert_eq!(submission.ratings[1].time, None);
        assert_eq!(submission.ratings[1].emotion(), Some(Emotion::Happiness));
    }

    #[test]
    fn rejects_missing_user_fields() {
        let no_user = json!({"ratings": []});
        let empty_name = json!({"user": {"name": "", "culture": "x"}, "ratings": []});
        let no_culture = json!({"user": {"name": "Ana"}, "ratings": []});

        for body in [no_user, empty_name, no_culture] {
            assert_eq!(
                Submission::from_json(&body),
                Err(SubmissionError::MissingFields)
            );
        }
    }

    #[test]
    fn rejects_non_sequence_ratings() {
        let body = json!({"user": {"name": "Ana", "culture": "x"}, "ratings": {"video": "a"}});
        assert_eq!(
            Submission::from_json(&body),
            Err(SubmissionError::MissingFields)
        );
    }

    #[test]
    fn loosely_typed_entries_degrade_to_text() {
        let body = json!({
            "user": {"name": "Ana", "culture": "x"},
            "ratings": [{"video": 7, "rating": null, "time": null}, "garbage"]
        });

        let submission = Submission::from_json(&body).unwrap();
        assert_eq!(submission.ratings[0].video, "7");
        assert_eq!(submission.ratings[0].rating, "");
        assert_eq!(submission.ratings[0].time, None);
        assert_eq!(submission.ratings[1], RatingEntry::default());
    }

    #[test]
    fn unknown_labels_have_no_emotion() {
        let entry = RatingEntry {
            rating: "Disgust".to_string(),
            ..Default::default()
        };
        assert_eq!(entry.emotion(), None);
    }
}
