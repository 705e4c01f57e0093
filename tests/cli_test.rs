//! CLI integration tests for the refbundle binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("refbundle"))
}

// Helper to create a temp document file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod resolve_command {
    use super::*;

    #[test]
    fn lists_every_reachable_document() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a:\n  $ref: ./leaf.yaml\n");
        write_temp_file(&dir, "leaf.yaml", "ok: true\n");

        cmd()
            .args(["resolve", root.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("root.yaml"))
            .stdout(predicate::str::contains("leaf.yaml"));
    }

    #[test]
    fn values_prints_document_contents() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a:\n  $ref: ./leaf.yaml\n");
        write_temp_file(&dir, "leaf.yaml", "ok: true\n");

        cmd()
            .args(["resolve", root.to_str().unwrap(), "--values"])
            .assert()
            .success()
            // --values output is pretty-printed
            .stdout(predicate::str::contains(r#""ok": true"#));
    }

    #[test]
    fn no_external_keeps_only_the_root() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a:\n  $ref: ./other.yaml\n");
        // other.yaml intentionally absent: it must never be read.

        cmd()
            .args(["resolve", root.to_str().unwrap(), "--no-external"])
            .assert()
            .success()
            .stdout(predicate::str::contains("root.yaml"))
            .stdout(predicate::str::contains("other.yaml").not());
    }

    #[test]
    fn continue_on_error_reports_and_succeeds() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(
            &dir,
            "root.yaml",
            "a:\n  $ref: ./missing.yaml\nb:\n  $ref: ./leaf.yaml\n",
        );
        write_temp_file(&dir, "leaf.yaml", "ok: true\n");

        cmd()
            .args(["resolve", root.to_str().unwrap(), "--continue-on-error"])
            .assert()
            .success()
            .stdout(predicate::str::contains("leaf.yaml"))
            .stderr(predicate::str::contains("missing.yaml"));
    }

    #[test]
    fn missing_reference_fails_without_the_flag() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a:\n  $ref: ./missing.yaml\n");

        cmd()
            .args(["resolve", root.to_str().unwrap()])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("missing.yaml"));
    }
}

mod dereference_command {
    use super::*;

    #[test]
    fn replaces_refs_with_their_targets() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(
            &dir,
            "root.yaml",
            "a:\n  $ref: '#/b'\nb:\n  type: string\n",
        );

        cmd()
            .args(["dereference", root.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""a":{"type":"string"}"#))
            .stdout(predicate::str::contains("$ref").not());
    }

    #[test]
    fn external_targets_are_inlined() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "pet:\n  $ref: ./pet.yaml\n");
        write_temp_file(&dir, "pet.yaml", "type: object\n");

        cmd()
            .args(["dereference", root.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""pet":{"type":"object"}"#));
    }

    #[test]
    fn pretty_prints_with_indentation() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a: 1\n");

        cmd()
            .args(["dereference", root.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn output_writes_the_file_instead_of_stdout() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a:\n  $ref: '#/b'\nb: 1\n");
        let output = dir.path().join("out.json");

        cmd()
            .args([
                "dereference",
                root.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains(r#""a":1"#));
    }

    #[test]
    fn circular_graph_warns_under_the_default_policy() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "a.yaml", "foo:\n  $ref: ./b.yaml\n");
        write_temp_file(&dir, "b.yaml", "foo:\n  $ref: ./a.yaml#/foo\n");

        cmd()
            .args(["dereference", root.to_str().unwrap()])
            .assert()
            .success()
            .stderr(predicate::str::contains("circular references at #/foo/foo"));
    }

    #[test]
    fn circular_error_policy_exits_with_code_1() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "a.yaml", "foo:\n  $ref: ./b.yaml\n");
        write_temp_file(&dir, "b.yaml", "foo:\n  $ref: ./a.yaml#/foo\n");

        cmd()
            .args([
                "dereference",
                root.to_str().unwrap(),
                "--circular",
                "error",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("circular"));
    }

    #[test]
    fn unknown_circular_policy_is_rejected() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a: 1\n");

        cmd()
            .args([
                "dereference",
                root.to_str().unwrap(),
                "--circular",
                "sometimes",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown circular policy"));
    }
}

mod bundle_command {
    use super::*;

    #[test]
    fn inlines_external_targets_under_definitions() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "pet:\n  $ref: ./pet.yaml\n");
        write_temp_file(&dir, "pet.yaml", "type: object\n");

        cmd()
            .args(["bundle", root.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r##""$ref":"#/definitions/pet""##))
            .stdout(predicate::str::contains(r#""pet":{"type":"object"}"#));
    }

    #[test]
    fn output_writes_the_file() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.yaml", "a:\n  $ref: ./leaf.yaml\n");
        write_temp_file(&dir, "leaf.yaml", "type: string\n");
        let output = dir.path().join("bundled.json");

        cmd()
            .args([
                "bundle",
                root.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains("#/definitions/leaf"));
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn missing_root_exits_with_code_3() {
        cmd()
            .args(["bundle", "/no/such/root.yaml"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Error"));
    }

    #[test]
    fn malformed_root_exits_with_code_2() {
        let dir = TempDir::new().unwrap();
        let root = write_temp_file(&dir, "root.json", "{nope");

        cmd()
            .args(["dereference", root.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Error"));
    }
}
