//! CLI integration tests for openapi-tools binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("openapi-tools"));
    for var in [
        "OPENAPI_BASE_URL",
        "OPENAPI_HEADERS",
        "OPENAPI_USERNAME",
        "OPENAPI_PASSWORD",
        "OPENAPI_TIMEOUT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

// Helper to create a temp document file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PETSTORE: &str = r#"{
    "openapi": "3.0.0",
    "servers": [{ "url": "https://petstore.example.com" }],
    "paths": {
        "/pets/{petId}": {
            "get": {
                "operationId": "getPet",
                "summary": "Get a pet",
                "parameters": [
                    { "name": "petId", "in": "path", "required": true, "schema": { "type": "integer" } },
                    { "name": "X-Tenant", "in": "header", "required": true, "schema": { "type": "string" } }
                ]
            }
        },
        "/pets": {
            "get": { "summary": "List pets" }
        }
    }
}"#;

mod tools_command {
    use super::*;

    #[test]
    fn prints_contracts() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args(["tools", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""name":"getPet""#))
            .stdout(predicate::str::contains(r#""name":"get__pets""#))
            .stdout(predicate::str::contains(r#""required":["petId","X-Tenant"]"#))
            .stdout(predicate::str::contains(r#""additionalProperties":false"#));
    }

    #[test]
    fn pretty_output() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args(["tools", doc.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\n  {\n"));
    }

    #[test]
    fn writes_output_file() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);
        let out = dir.path().join("tools.json");

        cmd()
            .args([
                "tools",
                doc.to_str().unwrap(),
                "--output",
                out.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written.as_array().unwrap().len(), 2);
    }

    #[test]
    fn yaml_document_without_servers() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "api.yaml",
            "openapi: 3.0.0\npaths:\n  /status:\n    get:\n      operationId: status\n",
        );

        cmd()
            .args(["tools", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""name":"status""#));
    }

    #[test]
    fn file_not_found() {
        cmd()
            .args(["tools", "/nonexistent/api.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_json_document() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", "{ not json");

        cmd()
            .args(["tools", doc.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn document_without_paths() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", r#"{"openapi": "3.0.0"}"#);

        cmd()
            .args(["tools", doc.to_str().unwrap()])
            .assert()
            .code(2);
    }
}

mod normalize_command {
    use super::*;

    #[test]
    fn fills_identifiers_and_responses() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args(["normalize", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""operationId":"get__pets""#))
            .stdout(predicate::str::contains(r#""200":{"description":"Successful response"}"#));
    }
}

mod call_command {
    use super::*;

    #[test]
    fn successful_call() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/pets/42")
            .match_header("x-tenant", "acme")
            .match_header("x-trace", "abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":42,"name":"Rex"}"#)
            .create();

        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args([
                "call",
                doc.to_str().unwrap(),
                "getPet",
                "--args",
                r#"{"petId": 42, "X-Tenant": "acme"}"#,
                "--base-url",
                &server.url(),
                "--header",
                "X-Trace: abc",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""name":"Rex""#))
            .stdout(predicate::str::contains(r#""operationId":"getPet""#))
            .stdout(predicate::str::contains(r#""statusText":"OK""#));

        mock.assert();
    }

    #[test]
    fn header_value_keeps_commas() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/pets")
            .match_header("accept", "text/html, application/json")
            .match_header("x-trace", "abc")
            .match_header("x-env", "a,b")
            .with_status(200)
            .create();

        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .env("OPENAPI_HEADERS", "X-Env: a,b; X-Trace: zzz")
            .args([
                "call",
                doc.to_str().unwrap(),
                "get__pets",
                "--base-url",
                &server.url(),
                "-H",
                "Accept: text/html, application/json",
                "-H",
                "X-Trace: abc",
            ])
            .assert()
            .success();

        mock.assert();
    }

    #[test]
    fn base_url_from_environment() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/pets").with_status(200).create();

        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .env("OPENAPI_BASE_URL", server.url())
            .args(["call", doc.to_str().unwrap(), "get__pets"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""status":200"#));

        mock.assert();
    }

    #[test]
    fn args_from_file() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/pets/7").with_status(200).create();

        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);
        let args = write_temp_file(&dir, "args.yaml", "petId: 7\nX-Tenant: acme\n");

        cmd()
            .args([
                "call",
                doc.to_str().unwrap(),
                "getPet",
                "--args-file",
                args.to_str().unwrap(),
                "--base-url",
                &server.url(),
            ])
            .assert()
            .success();

        mock.assert();
    }

    #[test]
    fn missing_parameters_exit_one() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args(["call", doc.to_str().unwrap(), "getPet"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(
                "missing required parameters: petId (path), X-Tenant (header)",
            ));
    }

    #[test]
    fn validate_flag_rejects_wrong_types() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args([
                "call",
                doc.to_str().unwrap(),
                "getPet",
                "--args",
                r#"{"petId": "42", "X-Tenant": "acme"}"#,
                "--validate",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""error":"validation""#));
    }

    #[test]
    fn unknown_tool_exit_two() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args(["call", doc.to_str().unwrap(), "deletePet"])
            .assert()
            .code(2)
            .stdout(predicate::str::contains(r#""error":"not_found""#));
    }

    #[test]
    fn upstream_failure_exit_four() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/pets")
            .with_status(500)
            .with_body("boom")
            .create();

        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args([
                "call",
                doc.to_str().unwrap(),
                "get__pets",
                "--base-url",
                &server.url(),
            ])
            .assert()
            .code(4)
            .stdout(predicate::str::contains(r#""status":500"#))
            .stdout(predicate::str::contains(r#""body":"boom""#));
    }

    #[test]
    fn missing_base_url_is_config_error() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "api.json",
            r#"{"paths": {"/pets": {"get": {"operationId": "listPets"}}}}"#,
        );

        cmd()
            .args(["call", doc.to_str().unwrap(), "listPets"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("no base URL"));
    }

    #[test]
    fn malformed_header_flag() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args([
                "call",
                doc.to_str().unwrap(),
                "get__pets",
                "--header",
                "no-colon",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("not NAME:VALUE"));
    }

    #[test]
    fn conflicting_argument_sources() {
        cmd()
            .args([
                "call",
                "api.json",
                "getPet",
                "--args",
                "{}",
                "--args-file",
                "args.json",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be used with"));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn clean_directory_passes() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 files checked, all passed"));
    }

    #[test]
    fn broken_reference_fails() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "api.json",
            r##"{
                "servers": [{ "url": "https://api.example.com" }],
                "paths": { "/a": { "get": { "operationId": "a",
                    "parameters": [{ "name": "q", "in": "query", "schema": { "$ref": "#/components/schemas/Nope" } }]
                } } }
            }"##,
        );

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E003"));
    }

    #[test]
    fn warnings_fail_in_strict_mode() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "api.yaml",
            "servers:\n  - url: https://api.example.com\npaths:\n  /a:\n    get: {}\n",
        );

        cmd()
            .args(["lint", doc.to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", doc.to_str().unwrap(), "--strict"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("W001"));
    }

    #[test]
    fn json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "api.json", PETSTORE);

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""files_checked": 1"#));
    }

    #[test]
    fn missing_path() {
        cmd()
            .args(["lint", "/nonexistent/dir"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod general {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("tools"))
            .stdout(predicate::str::contains("call"))
            .stdout(predicate::str::contains("lint"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("openapi-tools"));
    }

    #[test]
    fn missing_subcommand() {
        cmd().assert().failure();
    }
}
