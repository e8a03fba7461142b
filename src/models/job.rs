use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subject presentation requested by the kiosk. Unknown values fall back
/// to `Female`, matching the deployed kiosk fleet's default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Nonbinary,
}

impl Gender {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "nonbinary" | "non-binary" => Gender::Nonbinary,
            _ => Gender::Female,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Nonbinary => "nonbinary",
        }
    }
}

/// How large the subject appears in the composed scene. Unknown values
/// fall back to `Medium`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Prominence {
    Low,
    Medium,
    High,
}

impl Prominence {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "low" => Prominence::Low,
            "high" => Prominence::High,
            _ => Prominence::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Prominence::Low => "low",
            Prominence::Medium => "medium",
            Prominence::High => "high",
        }
    }
}

/// Options forwarded to the external generation call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationOptions {
    pub gender: Gender,
    pub prominence: Prominence,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            gender: Gender::Female,
            prominence: Prominence::Medium,
        }
    }
}

/// One admitted unit of work: a selfie plus a background and options,
/// routed through the job queue. Immutable once created.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub id: Uuid,
    pub kiosk_id: String,
    pub image: Vec<u8>,
    pub mime: String,
    pub background_id: String,
    pub options: GenerationOptions,
    pub submitted_at: DateTime<Utc>,
    pub priority: u8,
}

impl GenerationJob {
    pub fn new(
        kiosk_id: String,
        image: Vec<u8>,
        mime: String,
        background_id: String,
        options: GenerationOptions,
        submitted_at: DateTime<Utc>,
        priority: u8,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kiosk_id,
            image,
            mime,
            background_id,
            options,
            submitted_at,
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse_known_values() {
        assert_eq!(Gender::parse("female"), Gender::Female);
        assert_eq!(Gender::parse("male"), Gender::Male);
        assert_eq!(Gender::parse("MALE"), Gender::Male);
        assert_eq!(Gender::parse("nonbinary"), Gender::Nonbinary);
        assert_eq!(Gender::parse("non-binary"), Gender::Nonbinary);
    }

    #[test]
    fn test_gender_parse_unknown_falls_back() {
        assert_eq!(Gender::parse("alien"), Gender::Female);
        assert_eq!(Gender::parse(""), Gender::Female);
    }

    #[test]
    fn test_prominence_parse() {
        assert_eq!(Prominence::parse("low"), Prominence::Low);
        assert_eq!(Prominence::parse("medium"), Prominence::Medium);
        assert_eq!(Prominence::parse("HIGH"), Prominence::High);
        assert_eq!(Prominence::parse("whatever"), Prominence::Medium);
    }

    #[test]
    fn test_gender_serde() {
        let json = serde_json::to_string(&Gender::Male).expect("serialize");
        assert_eq!(json, "\"male\"");
        let back: Gender = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Gender::Male);
    }

    #[test]
    fn test_job_construction_assigns_unique_ids() {
        let opts = GenerationOptions::default();
        let now = Utc::now();
        let a = GenerationJob::new(
            "kiosk-1".to_string(),
            vec![1, 2, 3],
            "image/jpeg".to_string(),
            "bg-a".to_string(),
            opts,
            now,
            0,
        );
        let b = GenerationJob::new(
            "kiosk-1".to_string(),
            vec![1, 2, 3],
            "image/jpeg".to_string(),
            "bg-a".to_string(),
            opts,
            now,
            0,
        );
        assert_ne!(a.id, b.id);
        assert_eq!(a.background_id, "bg-a");
        assert_eq!(a.priority, 0);
    }
}
