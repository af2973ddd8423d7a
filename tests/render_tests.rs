use ferromark::renderer::{Config, HtmlRenderer};
use ferromark::Node;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
struct RenderTest {
    name: String,
    source: String,
    ast: Node,
    #[serde(default)]
    config: TestConfig,
    html: String,
}

#[derive(Debug, Default, Deserialize)]
struct TestConfig {
    #[serde(default)]
    hard_wraps: bool,
    #[serde(default)]
    xhtml: bool,
    #[serde(default, rename = "unsafe")]
    allow_unsafe: bool,
}

impl TestConfig {
    fn build(&self) -> Config {
        let mut config = Config::new();
        if self.hard_wraps {
            config = config.with_hard_wraps();
        }
        if self.xhtml {
            config = config.with_xhtml();
        }
        if self.allow_unsafe {
            config = config.with_unsafe();
        }
        config
    }
}

#[test]
fn render_fixture_cases() {
    let data = fs::read_to_string("tests/data/cases.json").expect("Failed to read cases.json");
    let tests: Vec<RenderTest> = serde_json::from_str(&data).expect("Failed to parse cases.json");

    for test in &tests {
        let renderer = HtmlRenderer::with_config(test.config.build());
        let mut out = Vec::new();
        renderer
            .render(&mut out, test.source.as_bytes(), &test.ast)
            .expect("in-memory render cannot fail");
        let html = String::from_utf8(out).expect("renderer produced invalid UTF-8");
        assert_eq!(html, test.html, "case failed: {}", test.name);
    }
}
