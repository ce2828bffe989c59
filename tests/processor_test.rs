use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use kiln::error::Error;
use kiln::processor::{commit, is_contained, is_template_file, Processor, RenderItem};
use kiln::renderer::MiniJinjaRenderer;
use kiln::values::TemplateContext;
use tempfile::TempDir;

fn context(values: serde_json::Value) -> TemplateContext {
    match values {
        serde_json::Value::Object(map) => TemplateContext::new(map),
        _ => panic!("values must be a mapping"),
    }
}

fn render(
    template_root: &Path,
    destination: &Path,
    values: serde_json::Value,
) -> kiln::error::Result<Vec<RenderItem>> {
    let engine = MiniJinjaRenderer::new();
    let context = context(values);
    let ignored = GlobSet::empty();
    Processor::new(&engine, &context, ".tpl", &ignored).render(template_root, destination)
}

#[test]
fn test_is_template_file() {
    assert!(is_template_file("template.html.tpl", ".tpl"));
    assert!(is_template_file("Makefile.tpl", ".tpl"));
    assert!(!is_template_file("regular.html", ".tpl"));
    assert!(!is_template_file("file.tplx", ".tpl"));
    assert!(!is_template_file(".tpl", ".tpl"));
}

#[test]
fn test_is_contained() {
    assert!(is_contained("/out/a/b.txt", "/out"));
    assert!(is_contained("/out/a/../b.txt", "/out"));
    assert!(!is_contained("/out/../etc/passwd", "/out"));
    assert!(!is_contained("/output-evil/x", "/out"));
    assert!(!is_contained("/out/.", "/out"));
}

#[test]
fn test_render_names_and_contents() {
    let temp_dir = TempDir::new().unwrap();
    let template_root = temp_dir.path().join("template");
    let destination = temp_dir.path().join("out");
    fs::create_dir_all(template_root.join("{{ Values.pkg }}")).unwrap();
    fs::write(
        template_root.join("{{ Values.pkg }}/hello-{{ Values.name }}.txt.tpl"),
        "Hi {{ Values.name }}",
    )
    .unwrap();
    fs::write(
        template_root.join("raw-{{ Values.name }}.txt"),
        "Hi {{ Values.name }}",
    )
    .unwrap();

    let values = serde_json::json!({"name": "world", "pkg": "core"});
    let items = render(&template_root, &destination, values).unwrap();

    // Source entries are visited by file name; '{' sorts after 'r'.
    let targets: Vec<PathBuf> = items.iter().map(RenderItem::target).collect();
    assert_eq!(
        targets,
        vec![
            destination.join("raw-world.txt"),
            destination.join("core"),
            destination.join("core/hello-world.txt"),
        ]
    );
    // Non-template content is copied verbatim.
    assert_eq!(items[0].content, b"Hi {{ Values.name }}");
    assert!(items[1].is_directory);
    assert_eq!(items[2].content, b"Hi world");
    assert!(items.iter().all(|item| !item.append));

    // Planning never touches the destination.
    assert!(!destination.exists());
}

#[test]
fn test_conditionals_and_loops() {
    let temp_dir = TempDir::new().unwrap();
    let template_root = temp_dir.path().join("template");
    fs::create_dir_all(&template_root).unwrap();
    fs::write(
        template_root.join("list.md.tpl"),
        "{% for item in Values.items %}- {{ item }}\n{% endfor %}{% if Values.footer %}end{% endif %}",
    )
    .unwrap();

    let items = render(
        &template_root,
        &temp_dir.path().join("out"),
        serde_json::json!({"items": ["a", "b"], "footer": true}),
    )
    .unwrap();
    assert_eq!(
        String::from_utf8(items[0].content.clone()).unwrap(),
        "- a\n- b\nend"
    );
}

#[test]
fn test_empty_name() {
    let temp_dir = TempDir::new().unwrap();
    let template_root = temp_dir.path().join("template");
    fs::create_dir_all(&template_root).unwrap();
    fs::write(template_root.join("{{ Values.missing }}"), "x").unwrap();

    let result = render(
        &template_root,
        &temp_dir.path().join("out"),
        serde_json::json!({}),
    );
    assert!(matches!(result, Err(Error::EmptyNameError { .. })));
}

#[test]
fn test_path_escape() {
    let temp_dir = TempDir::new().unwrap();
    let template_root = temp_dir.path().join("template");
    fs::create_dir_all(&template_root).unwrap();
    fs::write(template_root.join("{{ Values.name }}.txt"), "x").unwrap();

    let result = render(
        &template_root,
        &temp_dir.path().join("out"),
        serde_json::json!({"name": "../../escaped"}),
    );
    assert!(matches!(result, Err(Error::PathEscapeError { .. })));
}

#[test]
fn test_syntax_error_names_path() {
    let temp_dir = TempDir::new().unwrap();
    let template_root = temp_dir.path().join("template");
    fs::create_dir_all(&template_root).unwrap();
    fs::write(template_root.join("broken.txt.tpl"), "{% if %}").unwrap();

    match render(
        &template_root,
        &temp_dir.path().join("out"),
        serde_json::json!({}),
    ) {
        Err(Error::TemplateSyntaxError { path, .. }) => {
            assert_eq!(path, PathBuf::from("broken.txt.tpl"))
        }
        other => panic!("Expected TemplateSyntaxError, got {other:?}"),
    }
}

#[test]
fn test_reserved_dir_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let template_root = temp_dir.path().join("template");
    fs::create_dir_all(template_root.join(".kiln")).unwrap();
    fs::write(template_root.join(".kiln/notes"), "x").unwrap();
    fs::write(template_root.join("README"), "x").unwrap();

    let items = render(
        &template_root,
        &temp_dir.path().join("out"),
        serde_json::json!({}),
    )
    .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "README");
}

#[test]
fn test_commit_writes_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("out");
    let items = vec![
        RenderItem {
            directory: destination.clone(),
            name: "src".to_string(),
            is_directory: true,
            content: Vec::new(),
            append: false,
        },
        RenderItem {
            directory: destination.join("src"),
            name: "main.rs".to_string(),
            is_directory: false,
            content: b"fn main() {}\n".to_vec(),
            append: false,
        },
    ];

    commit(items).unwrap();
    assert_eq!(
        fs::read_to_string(destination.join("src/main.rs")).unwrap(),
        "fn main() {}\n"
    );
}

#[test]
fn test_commit_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("file.txt");
    fs::write(&target, "a much longer previous content").unwrap();

    commit(vec![RenderItem {
        directory: temp_dir.path().to_path_buf(),
        name: "file.txt".to_string(),
        is_directory: false,
        content: b"new".to_vec(),
        append: false,
    }])
    .unwrap();
    assert_eq!(fs::read_to_string(target).unwrap(), "new");
}

#[test]
fn test_rendered_name_with_parent_component() {
    let temp_dir = TempDir::new().unwrap();
    let template_root = temp_dir.path().join("template");
    let destination = temp_dir.path().join("out");
    fs::create_dir_all(&template_root).unwrap();
    fs::write(template_root.join("{{ Values.name }}.txt"), "x").unwrap();

    let items = render(
        &template_root,
        &destination,
        serde_json::json!({"name": "a/../b"}),
    )
    .unwrap();
    assert_eq!(items[0].directory, destination);
    assert_eq!(items[0].target(), destination.join("b.txt"));

    commit(items).unwrap();
    assert!(destination.join("b.txt").is_file());
    assert!(!destination.join("a").exists());
}
