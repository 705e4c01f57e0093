//! Integration tests for bundling.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;
use url::Url;

use refbundle::{bundle, dereference, resolve, Options, Source};

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn file_url(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

/// Collect every `$ref` string in the tree.
fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(target) = map.get("$ref").and_then(Value::as_str) {
                out.push(target.to_string());
            }
            for child in map.values() {
                collect_refs(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_refs(child, out);
            }
        }
        _ => {}
    }
}

#[test]
fn two_external_files_collapse_under_definitions() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "root.yaml",
        concat!(
            "properties:\n",
            "  address:\n",
            "    $ref: ./address.yaml\n",
            "  pet:\n",
            "    $ref: ./pet.yaml\n",
        ),
    );
    write(&dir, "address.yaml", "type: object\n");
    write(&dir, "pet.yaml", "type: object\nrequired: [name]\n");

    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();

    assert_eq!(
        out.value["properties"]["address"],
        json!({"$ref": "#/definitions/address"})
    );
    assert_eq!(
        out.value["properties"]["pet"],
        json!({"$ref": "#/definitions/pet"})
    );
    assert_eq!(out.value["definitions"]["address"], json!({"type": "object"}));
    assert_eq!(
        out.value["definitions"]["pet"],
        json!({"type": "object", "required": ["name"]})
    );
}

#[test]
fn every_ref_is_local_after_bundling() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "root.yaml",
        "a:\n  $ref: ./one.yaml\nb:\n  $ref: ./two.yaml#/x\n",
    );
    write(&dir, "one.yaml", "y:\n  $ref: ./two.yaml#/x\n");
    write(&dir, "two.yaml", "x:\n  type: integer\n");

    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();
    let mut refs = Vec::new();
    collect_refs(&out.value, &mut refs);
    assert!(!refs.is_empty());
    for target in &refs {
        assert!(target.starts_with('#'), "non-local ref survived: {target}");
    }
}

#[test]
fn bundled_output_references_a_single_document() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "root.yaml",
        "a:\n  $ref: ./one.yaml\nb:\n  $ref: ./two.yaml\n",
    );
    write(&dir, "one.yaml", "type: string\n");
    write(&dir, "two.yaml", "type: number\n");

    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();

    // Re-resolving the bundled tree discovers no other document.
    let src = Source::Document {
        base: file_url(&root),
        value: out.value.clone(),
    };
    let catalog = resolve(src, &Options::default()).unwrap();
    assert_eq!(catalog.paths(None), vec![file_url(&root)]);
}

#[test]
fn duplicate_targets_get_one_body() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "root.yaml",
        "a:\n  $ref: ./leaf.yaml#/name\nb:\n  $ref: ./leaf.yaml#/name\n",
    );
    write(&dir, "leaf.yaml", "name:\n  type: string\n");

    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();
    assert_eq!(out.value["a"], out.value["b"]);
    assert_eq!(out.value["a"], json!({"$ref": "#/definitions/name"}));
    assert_eq!(
        out.value["definitions"],
        json!({"name": {"type": "string"}})
    );
}

#[test]
fn name_collisions_get_numeric_suffixes() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "root.yaml",
        concat!(
            "a:\n",
            "  $ref: ./one.yaml#/definitions/item\n",
            "b:\n",
            "  $ref: ./two.yaml#/definitions/item\n",
            "definitions:\n",
            "  item:\n",
            "    type: boolean\n",
        ),
    );
    write(&dir, "one.yaml", "definitions:\n  item:\n    type: string\n");
    write(&dir, "two.yaml", "definitions:\n  item:\n    type: number\n");

    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();

    // The author's own definition is untouched; grafts dodge the collision.
    assert_eq!(out.value["definitions"]["item"], json!({"type": "boolean"}));
    assert_eq!(out.value["a"], json!({"$ref": "#/definitions/item_2"}));
    assert_eq!(out.value["b"], json!({"$ref": "#/definitions/item_3"}));
    assert_eq!(out.value["definitions"]["item_2"], json!({"type": "string"}));
    assert_eq!(out.value["definitions"]["item_3"], json!({"type": "number"}));
}

#[test]
fn dereferencing_the_bundle_matches_dereferencing_the_root() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "root.yaml",
        concat!(
            "properties:\n",
            "  pet:\n",
            "    $ref: ./pet.yaml\n",
            "  owner:\n",
            "    $ref: ./pet.yaml#/properties/owner\n",
        ),
    );
    write(
        &dir,
        "pet.yaml",
        concat!(
            "type: object\n",
            "properties:\n",
            "  owner:\n",
            "    type: string\n",
        ),
    );

    let direct = dereference(root.to_str().unwrap(), &Options::default()).unwrap();
    let bundled = bundle(root.to_str().unwrap(), &Options::default()).unwrap();
    let src = Source::Document {
        base: file_url(&root),
        value: bundled.value,
    };
    let rederef = dereference(src, &Options::default()).unwrap();

    // Equivalent at every position that existed in the root; the bundle's
    // synthetic definitions section is extra by construction.
    let direct_value = direct.graph.to_value();
    let rederef_value = rederef.graph.to_value();
    assert_eq!(direct_value["properties"], rederef_value["properties"]);
    assert!(!rederef.catalog.circular());
}

#[test]
fn circular_chains_stay_as_local_refs() {
    let dir = TempDir::new().unwrap();
    let root = write(&dir, "a.yaml", "foo:\n  $ref: ./b.yaml\n");
    write(&dir, "b.yaml", "foo:\n  $ref: ./a.yaml#/foo\n");

    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();
    assert_eq!(out.value["foo"], json!({"$ref": "#/definitions/b"}));
    assert_eq!(
        out.value["definitions"]["b"],
        json!({"foo": {"$ref": "#/foo"}})
    );

    // Dereferencing the bundle still finds the cycle rather than looping.
    let src = Source::Document {
        base: file_url(&root),
        value: out.value.clone(),
    };
    let rederef = dereference(src, &Options::default()).unwrap();
    assert!(rederef.catalog.circular());
}

#[test]
fn whole_document_targets_are_named_by_file_stem() {
    let dir = TempDir::new().unwrap();
    let root = write(&dir, "root.yaml", "pet:\n  $ref: ./pet.yaml\n");
    write(&dir, "pet.yaml", "type: object\n");

    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();
    assert_eq!(out.value["pet"], json!({"$ref": "#/definitions/pet"}));
}

#[test]
fn internal_root_refs_are_not_rewritten() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "root.yaml",
        concat!(
            "a:\n",
            "  $ref: '#/definitions/local'\n",
            "definitions:\n",
            "  local:\n",
            "    type: string\n",
        ),
    );
    let out = bundle(root.to_str().unwrap(), &Options::default()).unwrap();
    assert_eq!(out.value["a"], json!({"$ref": "#/definitions/local"}));
}
