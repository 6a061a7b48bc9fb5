//! Integration tests for template system.

use std::fs;
use std::path::Path;

use settler_templates::{
    MissingPolicy, ResolveOptions, TemplateError, TemplateLoader, TemplateRenderer,
    TemplateResolver, VariableMap,
};
use tempfile::tempdir;

const DRUPAL_8: &str = r#"<?php

$databases['default']['default'] = [
  'driver' => 'mysql',
  'database' => '{{ DB_NAME }}',
  'username' => '{{ DB_USERNAME }}',
  'password' => '{{ DB_PASSWORD }}',
  'host' => '{{ DB_HOST }}',
  'port' => '{{ DB_PORT }}',
];

$settings['hash_salt'] = '{{ DRUPAL_HASH_SALT }}';
"#;

const DRUPAL_7: &str = r#"<?php

$databases['default']['default'] = array(
  'driver' => 'mysql',
  'database' => '__replace_this_DB_NAME_value__',
  'username' => '__replace_this_DB_USERNAME_value__',
  'password' => '__replace_this_DB_PASSWORD_value__',
  'host' => '__replace_this_DB_HOST_value__',
);

$conf['redis_client_host'] = '__replace_this_REDIS_CLIENT_HOST_value__';
// $conf['redis_client_password'] = '__replace_this_REDIS_CLIENT_PASSWORD_value__';
"#;

const MANIFEST: &str = r#"
name: drupal-local
missing: fail
variables:
  - name: DB_HOST
    required: true
  - name: DB_PORT
    default: "3306"
    pattern: "^[0-9]+$"
templates:
  - template: drupal_settings
    variant: "8"
    destination: web/sites/default/settings.local.php
"#;

fn write_templates(dir: &Path) {
    let templates = dir.join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("drupal_settings.8.tpl.php"), DRUPAL_8).unwrap();
    fs::write(templates.join("drupal_settings.7.tpl.php"), DRUPAL_7).unwrap();
}

fn db_vars() -> VariableMap {
    VariableMap::from_pairs([
        ("DB_NAME", "drupal"),
        ("DB_USERNAME", "drupal"),
        ("DB_PASSWORD", "s3cr\\'t"),
        ("DB_HOST", "mariadb"),
        ("DRUPAL_HASH_SALT", "salt"),
        ("REDIS_CLIENT_HOST", "redis"),
    ])
}

#[test]
fn test_discover_templates() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());

    let loader = TemplateLoader::new(dir.path().join("templates"));
    let templates = loader.discover().unwrap();

    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0].variant.as_deref(), Some("7"));
    assert_eq!(templates[1].output_file_name(), "drupal_settings.8.php");
}

#[test]
fn test_render_drupal_7_leaves_optional_placeholders() {
    let renderer = TemplateRenderer::new();
    let result = renderer
        .render(DRUPAL_7, &db_vars(), &Default::default())
        .unwrap();

    assert!(result.output.contains("'host' => 'mariadb'"));
    assert!(result.output.contains("'password' => 's3cr\\'t'"));
    assert!(result
        .output
        .contains("__replace_this_REDIS_CLIENT_PASSWORD_value__"));
    assert_eq!(
        result.unresolved.into_iter().collect::<Vec<_>>(),
        vec!["REDIS_CLIENT_PASSWORD"]
    );
}

#[test]
fn test_resolve_manifest() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(&manifest_path, MANIFEST).unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let target = dir.path().join("site");
    let result = resolver
        .resolve(&db_vars(), &target, &ResolveOptions::new())
        .unwrap();

    assert_eq!(result.created_files.len(), 1);
    let written = fs::read_to_string(target.join("web/sites/default/settings.local.php")).unwrap();
    assert!(written.contains("'port' => '3306'"));
    assert!(written.contains("'host' => 'mariadb'"));
    assert!(result.unresolved().is_empty());
}

#[test]
fn test_resolve_missing_required_variable() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(&manifest_path, MANIFEST).unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let target = dir.path().join("site");
    let result = resolver.resolve(&VariableMap::new(), &target, &ResolveOptions::new());

    assert!(matches!(result, Err(TemplateError::MissingVariable(ref name)) if name == "DB_HOST"));
    assert!(!target.exists());
}

#[test]
fn test_missing_required_reports_one_identifier() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(
        &manifest_path,
        "name: drupal-local\nvariables:\n  - name: DB_HOST\n    required: true\n  - name: DB_NAME\n    required: true\ntemplates:\n  - template: drupal_settings.8.tpl.php\n",
    )
    .unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let result = resolver.render_all(&VariableMap::new(), dir.path());

    assert!(matches!(result, Err(TemplateError::MissingVariable(ref name)) if name == "DB_HOST"));

    let validation = resolver.validate(&VariableMap::new()).unwrap();
    assert!(validation.errors.iter().any(|e| e.contains("DB_HOST")));
    assert!(validation.errors.iter().any(|e| e.contains("DB_NAME")));
}

#[test]
fn test_strict_resolve_writes_nothing() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(
        &manifest_path,
        r#"
name: both
missing: fail
templates:
  - template: drupal_settings.7.tpl.php
    destination: d7.php
    missing: leave_as_is
  - template: drupal_settings.8.tpl.php
    destination: d8.php
"#,
    )
    .unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let target = dir.path().join("site");
    let vars = VariableMap::from_pairs([("DB_HOST", "db")]);
    let result = resolver.resolve(&vars, &target, &ResolveOptions::new());

    assert!(matches!(result, Err(TemplateError::MissingVariable(_))));
    assert!(!target.join("d7.php").exists());
}

#[test]
fn test_resolve_refuses_overwrite() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(&manifest_path, MANIFEST).unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let target = dir.path().join("site");
    resolver
        .resolve(&db_vars(), &target, &ResolveOptions::new())
        .unwrap();

    let again = resolver.resolve(&db_vars(), &target, &ResolveOptions::new());
    assert!(matches!(again, Err(TemplateError::AlreadyExists(_))));

    let forced = resolver.resolve(&db_vars(), &target, &ResolveOptions::new().overwrite(true));
    assert!(forced.is_ok());
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(&manifest_path, MANIFEST).unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let target = dir.path().join("site");
    let result = resolver
        .resolve(&db_vars(), &target, &ResolveOptions::new().dry_run(true))
        .unwrap();

    assert!(result.created_files.is_empty());
    assert_eq!(result.rendered.len(), 1);
    assert!(!target.exists());
}

#[test]
fn test_default_destination_strips_tpl() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(
        &manifest_path,
        r#"
name: d7
templates:
  - template: drupal_settings
    variant: "7"
"#,
    )
    .unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    assert_eq!(resolver.manifest().missing, MissingPolicy::LeaveAsIs);

    let target = dir.path().join("out");
    let result = resolver
        .resolve(&db_vars(), &target, &ResolveOptions::new())
        .unwrap();

    assert_eq!(result.created_files, vec![target.join("drupal_settings.7.php")]);
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_validate_manifest() {
    let dir = tempdir().unwrap();
    write_templates(dir.path());
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(&manifest_path, MANIFEST).unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();

    let result = resolver.validate(&db_vars()).unwrap();
    assert!(result.valid, "errors: {:?}", result.errors);

    let result = resolver
        .validate(&VariableMap::from_pairs([("DB_HOST", "db")]))
        .unwrap();
    assert!(!result.valid);
    // DB_NAME, DB_USERNAME, DB_PASSWORD and DRUPAL_HASH_SALT have no value.
    assert_eq!(result.errors.len(), 4);
}

#[test]
fn test_validate_reports_malformed_template() {
    let dir = tempdir().unwrap();
    let templates = dir.path().join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("config.tpl.php"), "$CFG->dbhost = '{{ DB_HOST';\n").unwrap();
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(
        &manifest_path,
        "name: moodle\ntemplates:\n  - template: config.tpl.php\n",
    )
    .unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let result = resolver.validate(&VariableMap::new()).unwrap();
    assert!(!result.valid);
    assert!(result.errors[0].contains("line 1"));

    let resolved = resolver.resolve(&VariableMap::new(), dir.path(), &ResolveOptions::new());
    assert!(matches!(resolved, Err(TemplateError::MalformedTemplate { .. })));
    assert!(!dir.path().join("config.php").exists());
}

#[test]
fn test_validate_continues_after_unreadable_template() {
    let dir = tempdir().unwrap();
    let templates = dir.path().join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("broken.tpl.php"), [0xff, 0xfe, 0x00, 0x7b]).unwrap();
    fs::write(templates.join("config.tpl.php"), "$CFG->dbhost = '{{ DB_HOST }}';\n").unwrap();
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(
        &manifest_path,
        "name: moodle\nmissing: fail\ntemplates:\n  - template: broken.tpl.php\n  - template: config.tpl.php\n",
    )
    .unwrap();

    let resolver = TemplateResolver::from_manifest_file(&manifest_path).unwrap();
    let result = resolver.validate(&VariableMap::new()).unwrap();

    assert!(!result.valid);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].contains("broken.tpl.php"));
    assert!(result.errors[1].contains("no value for DB_HOST"));
}

#[test]
fn test_invalid_manifest_rejected() {
    let dir = tempdir().unwrap();
    let manifest_path = dir.path().join("settler.yaml");
    fs::write(&manifest_path, "name: empty\ntemplates: []\n").unwrap();

    assert!(matches!(
        TemplateResolver::from_manifest_file(&manifest_path),
        Err(TemplateError::InvalidManifest { .. })
    ));
}
