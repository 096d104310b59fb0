use regex::Regex;
use serde::Serialize;

/// Contact fields pulled out of a "create contact" request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ContactChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Create(ContactDraft),
    Update { email: Option<String>, changes: ContactChanges },
    Search { email: Option<String> },
    SendMessage { phone: Option<String>, message: Option<String> },
    Unrecognized,
}

impl Intent {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::Create(_) => "create_contact",
            Self::Update { .. } => "update_contact",
            Self::Search { .. } => "find_contact",
            Self::SendMessage { .. } => "send_message",
            Self::Unrecognized => "unrecognized",
        }
    }
}

pub const SUPPORTED_PHRASES: &str = "create contact, send SMS, update contact, find contact";

/// Keyword and pattern matcher for free-text agent input. Patterns are
/// compiled once; [`IntentClassifier::classify`] is a pure function of the
/// text.
#[derive(Clone, Debug)]
pub struct IntentClassifier {
    create: Regex,
    send: Regex,
    update: Regex,
    search: Regex,
    names: Vec<Regex>,
    renamed: Regex,
    email: Regex,
    phone: Regex,
    new_phone: Regex,
    quoted: Regex,
}

impl IntentClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            create: Regex::new(r"(?i)\b(?:create|add|new)\s+(?:a\s+)?(?:new\s+)?contact\b")?,
            send: Regex::new(r"(?i)\b(?:send\s+(?:an?\s+)?(?:sms|text|message)|text\s+message)\b")?,
            update: Regex::new(r"(?i)\b(?:update|modify|edit|change)\s+(?:the\s+|a\s+)?contact\b")?,
            search: Regex::new(
                r"(?i)\b(?:find|get|lookup|look\s+up|search\s+for)\s+(?:the\s+|a\s+)?contact\b",
            )?,
            names: vec![
                Regex::new(r"(?i)\bnamed\s+([A-Za-z]+)\s+([A-Za-z]+)")?,
                Regex::new(r"(?i)\bfor\s+([A-Za-z]+)\s+([A-Za-z]+)")?,
                Regex::new(r"(?i)\bcontact\s+([A-Za-z]+)\s+([A-Za-z]+)")?,
            ],
            renamed: Regex::new(r"(?i)\b(?:name|called)\s+(?:is\s+|to\s+)?([A-Za-z]+)\s+([A-Za-z]+)")?,
            email: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")?,
            phone: Regex::new(r"\d{3}[-.\s]?\d{3}[-.\s]?\d{4}")?,
            new_phone: Regex::new(r"(?i)\b(?:phone|number)\s+(?:is\s+|to\s+)?(\d{3}[-.\s]?\d{3}[-.\s]?\d{4})")?,
            quoted: Regex::new(r#"message\s+['"]([^'"]+)['"]|['"]([^'"]+)['"]"#)?,
        })
    }

    /// Checked in order: create, send, update, search.
    pub fn classify(&self, text: &str) -> Intent {
        if self.create.is_match(text) {
            return Intent::Create(self.draft(text));
        }
        if self.send.is_match(text) {
            return Intent::SendMessage { phone: self.phone(text), message: self.message(text) };
        }
        if self.update.is_match(text) {
            return Intent::Update { email: self.email(text), changes: self.changes(text) };
        }
        if self.search.is_match(text) {
            return Intent::Search { email: self.email(text) };
        }
        Intent::Unrecognized
    }

    fn draft(&self, text: &str) -> ContactDraft {
        let (first_name, last_name) = self
            .names
            .iter()
            .find_map(|pattern| two_words(pattern, text))
            .map_or((None, None), |(first, last)| (Some(first), Some(last)));
        ContactDraft { first_name, last_name, email: self.email(text), phone: self.phone(text) }
    }

    fn changes(&self, text: &str) -> ContactChanges {
        let (first_name, last_name) = two_words(&self.renamed, text)
            .map_or((None, None), |(first, last)| (Some(first), Some(last)));
        let phone = self
            .new_phone
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|digits| normalize_phone(digits.as_str()));
        ContactChanges { first_name, last_name, phone }
    }

    fn email(&self, text: &str) -> Option<String> {
        self.email.find(text).map(|found| found.as_str().to_string())
    }

    fn phone(&self, text: &str) -> Option<String> {
        self.phone.find(text).map(|found| normalize_phone(found.as_str()))
    }

    fn message(&self, text: &str) -> Option<String> {
        let captures = self.quoted.captures(text)?;
        captures.get(1).or_else(|| captures.get(2)).map(|found| found.as_str().to_string())
    }
}

fn two_words(pattern: &Regex, text: &str) -> Option<(String, String)> {
    let captures = pattern.captures(text)?;
    Some((captures.get(1)?.as_str().to_string(), captures.get(2)?.as_str().to_string()))
}

fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
