use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SYNTAX: &str = r#"
id: mini
syntax:
  - kind: keyword
    group: Statement
    words: [if, return]
  - kind: match
    group: Number
    pattern: '\d+'
  - kind: region
    group: String
    start: '"'
    end: '"'
"#;

const SOURCE: &str = "if x\nreturn \"a<b\" 42\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mini.yaml"), SYNTAX).unwrap();
        fs::write(dir.path().join("input.txt"), SOURCE).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[test]
fn highlights_a_file_as_html() {
    let fixture = Fixture::new();
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml")).arg(fixture.path("input.txt"));

    let output_pred = predicate::str::starts_with("<pre class=\"vimscan mini\">")
        .and(predicate::str::contains("<span class=\"statement\">if</span> x\n"))
        .and(predicate::str::contains(
            "<span class=\"string\">&quot;a&lt;b&quot;</span>",
        ))
        .and(predicate::str::contains("<span class=\"number\">42</span>"))
        .and(predicate::str::ends_with("</pre>\n"));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn reads_stdin_when_no_input_is_given() {
    let fixture = Fixture::new();
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml"))
        .arg("--format")
        .arg("plain")
        .write_stdin(SOURCE);

    cmd.assert().success().stdout(SOURCE);
}

#[test]
fn tokens_format_dumps_json_runs() {
    let fixture = Fixture::new();
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml"))
        .arg(fixture.path("input.txt"))
        .arg("-f")
        .arg("tokens");

    let output_pred = predicate::str::contains("\"mode\": \"Number\"")
        .and(predicate::str::contains("\"text\": \"42\""))
        .and(predicate::str::contains("\"text\": \"return\""));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn small_windows_from_overrides_give_the_same_output() {
    let fixture = Fixture::new();
    let long: String = SOURCE.repeat(40);
    fs::write(fixture.path("long.txt"), &long).unwrap();

    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml"))
        .arg(fixture.path("long.txt"))
        .args(["--format", "plain"])
        .args(["--set", "reader.window_size=64"])
        .args(["--set", "reader.safety_margin=16"])
        .args(["--set", "writer.flush_threshold=4"]);

    cmd.assert().success().stdout(predicate::eq(long));
}

#[test]
fn config_file_sets_line_numbers() {
    let fixture = Fixture::new();
    fs::write(fixture.path("scan.toml"), "[output]\nline_numbers = true\n").unwrap();

    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml"))
        .arg(fixture.path("input.txt"))
        .arg("--config")
        .arg(fixture.path("scan.toml"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<span class=\"line-number\">   2 </span>"));
}

#[test]
fn lists_modes() {
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg("--list-modes");

    cmd.assert().success().stdout(
        predicate::str::contains("Available highlight modes")
            .and(predicate::str::contains("SpecialChar"))
            .and(predicate::str::contains("preproc")),
    );
}

#[test]
fn missing_syntax_file_fails() {
    let fixture = Fixture::new();
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("nope.yaml")).arg(fixture.path("input.txt"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot read syntax file"));
}

#[test]
fn malformed_override_fails() {
    let fixture = Fixture::new();
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml"))
        .arg(fixture.path("input.txt"))
        .args(["--set", "reader.window_size"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("is not of the form key=value"));
}

#[test]
fn unknown_format_fails() {
    let fixture = Fixture::new();
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml"))
        .arg(fixture.path("input.txt"))
        .args(["--format", "pdf"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn margin_as_large_as_the_window_fails() {
    let fixture = Fixture::new();
    let mut cmd = cargo_bin_cmd!("vimscan");
    cmd.arg(fixture.path("mini.yaml"))
        .arg(fixture.path("input.txt"))
        .args(["--set", "reader.window_size=64"])
        .args(["--set", "reader.safety_margin=64"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must be smaller than the window size"));
}
