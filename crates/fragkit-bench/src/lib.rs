//! # FragKit Bench
//!
//! Input generators and a small in-process runner for FragKit benchmarks.
//! The criterion suite lives in `benches/fragkit.rs`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fragkit_bench::Benchmark;
//!
//! let suite = Benchmark::new().with_iterations(50).run_all()?;
//! suite.print_summary();
//! ```

use fragkit_dom::{Document, DocumentFragment, DomError, SaveOptions};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Benchmark errors.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Benchmark failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] DomError),
}

/// A single benchmark result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub iterations: u64,
    /// Mean time per iteration in nanoseconds.
    pub mean_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    /// Input bytes processed per second.
    pub bytes_per_sec: f64,
}

impl BenchmarkResult {
    /// Create a new result from sample times over an input of `input_len` bytes.
    pub fn from_samples(name: impl Into<String>, samples: &[Duration], input_len: usize) -> Self {
        let times_ns: Vec<u64> = samples.iter().map(|d| d.as_nanos() as u64).collect();
        let iterations = times_ns.len() as u64;
        let total_ns: u64 = times_ns.iter().sum();
        let mean_ns = total_ns.checked_div(iterations).unwrap_or(0);

        let bytes_per_sec = if mean_ns > 0 {
            input_len as f64 * 1_000_000_000.0 / mean_ns as f64
        } else {
            0.0
        };

        Self {
            name: name.into(),
            iterations,
            mean_ns,
            min_ns: times_ns.iter().copied().min().unwrap_or(0),
            max_ns: times_ns.iter().copied().max().unwrap_or(0),
            bytes_per_sec,
        }
    }

    pub fn print_line(&self) {
        println!(
            "{:40} {:>12} {:>12} {:>12}/s",
            self.name,
            format_duration(self.mean_ns),
            format_duration(self.max_ns),
            format_bytes(self.bytes_per_sec),
        );
    }
}

/// Format nanoseconds as human-readable duration.
fn format_duration(ns: u64) -> String {
    if ns >= 1_000_000_000 {
        format!("{:.2} s", ns as f64 / 1_000_000_000.0)
    } else if ns >= 1_000_000 {
        format!("{:.2} ms", ns as f64 / 1_000_000.0)
    } else if ns >= 1_000 {
        format!("{:.2} µs", ns as f64 / 1_000.0)
    } else {
        format!("{} ns", ns)
    }
}

fn format_bytes(rate: f64) -> String {
    if rate >= 1_048_576.0 {
        format!("{:.2} MiB", rate / 1_048_576.0)
    } else if rate >= 1_024.0 {
        format!("{:.2} KiB", rate / 1_024.0)
    } else {
        format!("{:.0} B", rate)
    }
}

/// Collection of benchmark results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSuite {
    pub name: String,
    pub results: Vec<BenchmarkResult>,
    pub total_time: Duration,
}

impl BenchmarkSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
            total_time: Duration::ZERO,
        }
    }

    pub fn add(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    /// Print summary of all results.
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("Benchmark Suite: {}", self.name);
        println!("{}", "=".repeat(80));
        println!("{:40} {:>12} {:>12} {:>12}", "Name", "Mean", "Max", "Throughput");
        println!("{}", "-".repeat(80));
        for result in &self.results {
            result.print_line();
        }
        println!("{}", "-".repeat(80));
        println!("Total time: {:?}", self.total_time);
    }

    /// Save results to JSON file.
    pub fn save_json(&self, path: &str) -> Result<(), BenchError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| BenchError::Failed(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Benchmark runner.
pub struct Benchmark {
    pub warmup: u64,
    pub iterations: u64,
}

impl Benchmark {
    pub fn new() -> Self {
        Self {
            warmup: 10,
            iterations: 100,
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_warmup(mut self, warmup: u64) -> Self {
        self.warmup = warmup;
        self
    }

    /// Time `f`, which processes `input_len` bytes per call.
    pub fn run<F>(&self, name: &str, input_len: usize, mut f: F) -> Result<BenchmarkResult, BenchError>
    where
        F: FnMut() -> Result<(), BenchError>,
    {
        debug!(name, warmup = self.warmup, iterations = self.iterations, "Running benchmark");

        for _ in 0..self.warmup {
            f()?;
        }

        let mut samples = Vec::with_capacity(self.iterations as usize);
        for _ in 0..self.iterations {
            let start = Instant::now();
            f()?;
            samples.push(start.elapsed());
        }

        Ok(BenchmarkResult::from_samples(name, &samples, input_len))
    }

    /// Run all standard benchmarks.
    pub fn run_all(&self) -> Result<BenchmarkSuite, BenchError> {
        let start = Instant::now();
        let mut suite = BenchmarkSuite::new("FragKit");

        for (label, size) in [("small", 10), ("medium", 100), ("large", 1000)] {
            let html = generate_fragment(size);
            suite.add(self.run(&format!("fragment/parse/{}", label), html.len(), || {
                DocumentFragment::parse(&html, None, None)?;
                Ok(())
            })?);
        }

        let malformed = generate_malformed(100);
        suite.add(self.run("fragment/recover", malformed.len(), || {
            DocumentFragment::parse(&malformed, None, None)?;
            Ok(())
        })?);

        let html = generate_fragment(100);
        let document = Document::parse_html("<html><body><div id='ctx'></div></body></html>")?;
        let context = document
            .get_element_by_id("ctx")
            .ok_or_else(|| BenchError::Failed("context element missing".to_string()))?;
        suite.add(self.run("fragment/in-context", html.len(), || {
            DocumentFragment::new(&document, &html, Some(&context), None)?;
            Ok(())
        })?);

        let fragment = DocumentFragment::parse(&html, None, None)?;
        for (label, options) in [
            ("html", SaveOptions::html()),
            ("xhtml", SaveOptions::xhtml()),
            ("xml", SaveOptions::xml()),
        ] {
            suite.add(self.run(&format!("serialize/{}", label), html.len(), || {
                fragment.serialize(&options)?;
                Ok(())
            })?);
        }

        suite.total_time = start.elapsed();
        Ok(suite)
    }
}

impl Default for Benchmark {
    fn default() -> Self {
        Self::new()
    }
}

/// A well-formed fragment with `n` list items and paragraphs.
pub fn generate_fragment(n: usize) -> String {
    let mut html = String::from("<ul>");
    for i in 0..n {
        html.push_str(&format!(
            "<li class=\"item\" id=\"item{}\">Item {} &amp; <b>more</b></li>",
            i, i
        ));
    }
    html.push_str("</ul>");
    for i in 0..n {
        html.push_str(&format!("<p>Paragraph {}<br>line two</p>\n", i));
    }
    html
}

/// A fragment full of markup the parser has to repair.
pub fn generate_malformed(n: usize) -> String {
    let mut html = String::new();
    for i in 0..n {
        html.push_str(&format!(
            "<div><span>{}<p>unclosed <jimmy>{}</div></span><li>a<li>b<td>c",
            i, i
        ));
    }
    html.push_str("<div </div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_result() {
        let samples = vec![
            Duration::from_micros(100),
            Duration::from_micros(120),
            Duration::from_micros(90),
        ];
        let result = BenchmarkResult::from_samples("test", &samples, 1_000);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.min_ns, 90_000);
        assert_eq!(result.max_ns, 120_000);
        assert!(result.bytes_per_sec > 0.0);
    }

    #[test]
    fn test_empty_samples() {
        let result = BenchmarkResult::from_samples("empty", &[], 10);
        assert_eq!(result.mean_ns, 0);
        assert_eq!(result.bytes_per_sec, 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(500), "500 ns");
        assert_eq!(format_duration(1_500), "1.50 µs");
        assert_eq!(format_duration(1_500_000), "1.50 ms");
        assert_eq!(format_duration(1_500_000_000), "1.50 s");
    }

    #[test]
    fn test_generated_inputs_parse() {
        let fragment = DocumentFragment::parse(generate_fragment(5), None, None).unwrap();
        assert_eq!(fragment.select("li").len(), 5);
        assert!(fragment.errors().is_empty());

        let fragment = DocumentFragment::parse(generate_malformed(3), None, None).unwrap();
        assert!(!fragment.errors().is_empty());
    }

    #[test]
    fn test_run_all_small() {
        let suite = Benchmark::new().with_warmup(0).with_iterations(1).run_all().unwrap();
        assert_eq!(suite.results.len(), 8);
    }
}
