use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pulldown_cmark::{CodeBlockKind, Event, Parser as CmarkParser, Tag, TagEnd};
use serde::Deserialize;
use serde_json::Value;

use blocktree::parser::Parser;

/// Operation a fixture exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Template,
    Extract,
    Hydrate,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    pub operation: Operation,

    /// Expected load error: the first error message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// Fenced `json <role>` blocks of a fixture body.
#[derive(Debug, Default)]
struct Fences {
    input: Option<String>,
    record: Option<String>,
    expect: Option<String>,
}

/// Split a `.test.md` file into its TOML front matter and Markdown body.
fn split_front_matter(content: &str) -> Result<(&str, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;
    let front = after_open[..close_pos].trim_end_matches('\r');
    let body = &after_open[close_pos + 4..];
    Ok((front, body))
}

/// Collect the fenced code blocks tagged `json input`, `json record` and `json expect`.
fn collect_fences(body: &str) -> Result<Fences, String> {
    let mut fences = Fences::default();
    let mut current: Option<(String, String)> = None;

    for event in CmarkParser::new(body) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let mut words = info.split_whitespace();
                if words.next() == Some("json") {
                    let role = words.next().unwrap_or("").to_string();
                    current = Some((role, String::new()));
                }
            }
            Event::Text(text) => {
                if let Some((_, content)) = current.as_mut() {
                    content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((role, content)) = current.take() {
                    let slot = match role.as_str() {
                        "input" => &mut fences.input,
                        "record" => &mut fences.record,
                        "expect" => &mut fences.expect,
                        other => return Err(format!("unknown fence role '{}'", other)),
                    };
                    if slot.replace(content).is_some() {
                        return Err(format!("duplicate `json {}` fence", role));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(fences)
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.trim_end_matches(".test.md"))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match check_fixture(path) {
        Ok((description, None)) => (description, TestOutcome::Pass),
        Ok((description, Some(reason))) => (description, TestOutcome::Fail(reason)),
        Err(reason) => (None, TestOutcome::Fail(reason)),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Run one fixture. `Err` means the fixture itself is broken; `Ok(Some(_))` is
/// a failed expectation.
fn check_fixture(path: &Path) -> Result<(Option<String>, Option<String>), String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read file: {}", e))?;
    let (front, body) = split_front_matter(&content).map_err(|e| format!("frontmatter error: {}", e))?;
    let config: TestConfig =
        toml::from_str(front).map_err(|e| format!("frontmatter error: TOML parse error: {}", e))?;
    let fences = collect_fences(body)?;
    let input = fences.input.as_deref().ok_or("missing `json input` fence")?;

    let blocks = Parser::new(input.to_string(), 0).parse();
    if let Some(expected) = &config.expect_error {
        let outcome = match blocks {
            Err(errors) if errors[0].message.contains(expected.as_str()) => None,
            Err(errors) => Some(format!(
                "expected error containing \"{}\", got: {}",
                expected, errors[0].message
            )),
            Ok(_) => Some(format!(
                "expected error containing \"{}\", but the input loaded",
                expected
            )),
        };
        return Ok((config.description, outcome));
    }

    let blocks = blocks.map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
        format!("unexpected load error: {}", messages.join("; "))
    })?;
    let expect = fences.expect.as_deref().ok_or("missing `json expect` fence")?;

    let mismatch = match config.operation {
        Operation::Template => {
            let actual = to_json(&fieldmap::convert_blocks(&blocks))?;
            let expected: Value = serde_json::from_str(expect)
                .map_err(|e| format!("invalid `json expect` fence: {}", e))?;
            compare_text(&to_json(&expected)?, &actual)
        }
        Operation::Extract => {
            let actual = serde_json::to_value(fieldmap::extract_blocks(&blocks))
                .map_err(|e| e.to_string())?;
            let expected: Value = serde_json::from_str(expect)
                .map_err(|e| format!("invalid `json expect` fence: {}", e))?;
            (actual != expected).then(|| mismatch_message(&expected, &actual))
        }
        Operation::Hydrate => {
            let record_source = fences.record.ok_or("missing `json record` fence")?;
            let record = Parser::new(record_source, 0)
                .parse_record()
                .map_err(|errors| format!("invalid `json record` fence: {}", errors[0].message))?;
            let expected = Parser::new(expect.to_string(), 0)
                .parse()
                .map_err(|errors| format!("invalid `json expect` fence: {}", errors[0].message))?;
            let actual = to_json(&fieldmap::hydrate_blocks(&blocks, &record))?;
            compare_text(&to_json(&expected)?, &actual)
        }
    };

    Ok((config.description, mismatch))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// Compare serialized output exactly; attribute order is significant.
fn compare_text(expected: &str, actual: &str) -> Option<String> {
    (expected != actual).then(|| format!("output mismatch\n  expected: {}\n  actual:   {}", expected, actual))
}

fn mismatch_message(expected: &Value, actual: &Value) -> String {
    format!("output mismatch\n  expected: {}\n  actual:   {}", expected, actual)
}

/// Discover `.test.md` files grouped by category (sub-folder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".test.md"))
            {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                categories.entry(category).or_default().push(path);
            }
        }
    }

    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Select the categories to run. An empty request selects everything; a
/// request also matches nested categories below it. Requests that matched
/// no category are returned alongside the selection.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &'a [String],
) -> (BTreeMap<&'a str, &'a [PathBuf]>, Vec<&'a str>) {
    if requested.is_empty() {
        let selected = all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
        return (selected, Vec::new());
    }

    let mut selected = BTreeMap::new();
    let mut unmatched = Vec::new();
    for request in requested {
        let request = request.trim_matches('/');
        let prefix = format!("{}/", request);
        let mut matched = 0usize;
        for (category, files) in all {
            if category == request || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files.as_slice());
                matched += 1;
            }
        }
        if matched == 0 {
            unmatched.push(request);
        }
    }
    (selected, unmatched)
}

/// Run all `.test.md` files under `path` (or a single file).
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { no_color };

    let discovered = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if discovered.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let (selected, unmatched) = select_categories(&discovered, categories);
    for request in &unmatched {
        eprintln!(
            "warning: category '{}' not found (available: {})",
            request,
            discovered
                .keys()
                .map(|k| category_label(k))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        eprintln!();
        eprintln!("{}", style.bold(category_label(category)));

        for file in files.iter() {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
