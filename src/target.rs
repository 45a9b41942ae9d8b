//! Probe targets: definitions, per-repetition instances, and the remote suite source

/// Upstream suite page holding the `const TEST_SUITE` array
pub const DEFAULT_SUITE_URL: &str =
    "https://raw.githubusercontent.com/hyperion-cs/dpi-checkers/refs/heads/main/ru/tcp-16-20/suite.json";

/// One configured probe: where to fetch and how many times
#[derive(Debug, Clone)]
pub struct Target {
    pub id: String,
    pub provider: String,
    pub url: String,
    pub repetitions: u32,
}

/// One concrete execution attempt derived from a Target and a repetition index
#[derive(Debug, Clone)]
pub struct ProbeInstance {
    pub display_id: String,
    pub target: Target,
}

impl ProbeInstance {
    /// `index` is 0-based; the display id carries it only when a target
    /// runs more than once.
    pub fn new(target: &Target, index: u32) -> Self {
        let display_id = if target.repetitions > 1 {
            format!("{}@{}", target.id, index)
        } else {
            target.id.clone()
        };
        Self {
            display_id,
            target: target.clone(),
        }
    }
}

/// Built-in fallback suite used when the remote suite cannot be loaded
pub fn default_suite() -> Vec<Target> {
    Vec::new()
}

/// Supplier of the target list. Fetch is all-or-nothing: an error or an
/// empty parse must never replace a list the caller already holds.
#[allow(async_fn_in_trait)]
pub trait TargetSource {
    async fn fetch(&self) -> anyhow::Result<Vec<Target>>;
}

/// Fetches the upstream suite page and scans it for the embedded
/// `const TEST_SUITE` array.
pub struct RemoteSuiteSource {
    url: String,
}

impl RemoteSuiteSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl TargetSource for RemoteSuiteSource {
    async fn fetch(&self) -> anyhow::Result<Vec<Target>> {
        tracing::debug!("Fetching target suite from {}", self.url);
        let body = reqwest::get(&self.url).await?.text().await?;
        let array = extract_suite_array(&body)
            .ok_or_else(|| anyhow::anyhow!("no TEST_SUITE array found in suite page"))?;
        let targets = parse_suite(array);
        if targets.is_empty() {
            anyhow::bail!("TEST_SUITE array contained no valid targets");
        }
        tracing::debug!("Loaded {} target(s) from remote suite", targets.len());
        Ok(targets)
    }
}

/// Locate the bracket-balanced `[...]` that follows the `const TEST_SUITE`
/// marker. The page is loosely formatted JS, not strict JSON.
fn extract_suite_array(text: &str) -> Option<&str> {
    let marker = text.find("const TEST_SUITE")?;
    let open = marker + text[marker..].find('[')?;
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..open + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse every brace-balanced `{...}` object in the array text. Objects
/// without an `id` are skipped.
fn parse_suite(array: &str) -> Vec<Target> {
    let mut out = Vec::new();
    let bytes = array.as_bytes();
    let mut i = 0;
    while let Some(rel) = array[i..].find('{') {
        let start = i + rel;
        let mut depth = 0usize;
        let mut end = None;
        for (j, &b) in bytes.iter().enumerate().skip(start) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(j);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else { break };
        if let Some(target) = parse_object(&array[start..=end]) {
            out.push(target);
        }
        i = end + 1;
    }
    out
}

fn parse_object(obj: &str) -> Option<Target> {
    let id = string_field(obj, "id")?;
    if id.is_empty() {
        return None;
    }
    Some(Target {
        id,
        provider: string_field(obj, "provider").unwrap_or_default(),
        url: string_field(obj, "url").unwrap_or_default(),
        repetitions: int_field(obj, "times").unwrap_or(1).max(1),
    })
}

fn string_field(obj: &str, key: &str) -> Option<String> {
    let at = obj.find(&format!("{key}:"))?;
    let open = at + obj[at..].find('"')?;
    let close = open + 1 + obj[open + 1..].find('"')?;
    Some(obj[open + 1..close].to_string())
}

fn int_field(obj: &str, key: &str) -> Option<u32> {
    let pat = format!("{key}:");
    let at = obj.find(&pat)? + pat.len();
    let rest = obj[at..].trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
