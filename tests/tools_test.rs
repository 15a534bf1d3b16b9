//! Tests for toolbox tools

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use std::io::Cursor;
    use std::path::Path;
    use std::time::Duration;

    use toolbox::content::{self, Catalog};
    use toolbox::descriptor::{OutputField, ToolDescriptor};
    use toolbox::form::{collect_inputs, FormError};
    use toolbox::logic::compress_image::compression_ratio;
    use toolbox::runner::{dispatch, RunError};
    use toolbox::{data_url, plugin, render};
    use toolbox::{FileHandle, FormState, FormSubmission, InputValue, Inputs, ToolRunner};

    fn builtin(id: &str) -> ToolDescriptor {
        Catalog::builtin().unwrap().get(id).unwrap().clone()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    // ==================== Form Collection ====================

    #[test]
    fn test_collect_number_and_checkbox() {
        let tool = builtin("text-counter");
        let submission = FormSubmission::new().field("text", "hello");
        let inputs = collect_inputs(&tool, &submission).unwrap();
        assert_eq!(inputs.text("text"), Some("hello"));
        // Absent checkbox is unchecked even with a declared default
        assert_eq!(inputs.flag("includeSpaces"), Some(false));

        let submission = FormSubmission::new().field("text", "hello").field("includeSpaces", "on");
        let inputs = collect_inputs(&tool, &submission).unwrap();
        assert_eq!(inputs.flag("includeSpaces"), Some(true));

        let submission = FormSubmission::new().field("text", "hello").field("includeSpaces", "off");
        let inputs = collect_inputs(&tool, &submission).unwrap();
        assert_eq!(inputs.flag("includeSpaces"), Some(false));

        let tool = builtin("compress-image");
        let submission = FormSubmission::new()
            .field("quality", "55abc")
            .file("imageFile", FileHandle::new("a.png", vec![1, 2, 3]));
        let inputs = collect_inputs(&tool, &submission).unwrap();
        assert_eq!(inputs.number("quality"), Some(55.0));
        assert_eq!(inputs.number("maxWidth"), Some(0.0));
    }

    #[test]
    fn test_checkbox_without_default_is_false() {
        let tool = ToolDescriptor::from_json(r#"{
            "id": "flags", "title": "Flags", "description": "",
            "inputs": [{"id": "on", "type": "checkbox", "label": "On", "required": false}],
            "outputs": [],
            "logic": "textCounter"
        }"#).unwrap();
        let inputs = collect_inputs(&tool, &FormSubmission::new()).unwrap();
        assert_eq!(inputs.flag("on"), Some(false));
    }

    #[test]
    fn test_form_state_seeds_defaults() {
        let tool = builtin("text-counter");
        let mut state = FormState::for_descriptor(&tool);
        assert_eq!(state.values.get("includeSpaces").map(String::as_str), Some("true"));
        assert!(!state.values.contains_key("text"));

        state.set("text", "a b");
        let inputs = collect_inputs(&tool, &state.submission()).unwrap();
        assert_eq!(inputs.flag("includeSpaces"), Some(true));

        let state = FormState::for_descriptor(&builtin("compress-image"));
        assert_eq!(state.values.get("quality").map(String::as_str), Some("80"));
        assert!(!state.values.contains_key("maxWidth"));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = FileHandle::open("/nonexistent/photo.png").await.unwrap_err();
        assert_eq!(err.path, Path::new("/nonexistent/photo.png"));
        assert!(err.to_string().starts_with("Failed to read /nonexistent/photo.png"));
    }

    #[test]
    fn test_missing_required_field() {
        let tool = builtin("url-encoder");
        let err = collect_inputs(&tool, &FormSubmission::new()).unwrap_err();
        assert_eq!(err, FormError::MissingField("inputText".into()));

        let tool = builtin("compress-image");
        let err = collect_inputs(&tool, &FormSubmission::new()).unwrap_err();
        assert_eq!(err, FormError::MissingField("imageFile".into()));
    }

    #[test]
    fn test_invalid_select_option() {
        let tool = builtin("url-encoder");
        let submission = FormSubmission::new().field("inputText", "x").field("operation", "rot13");
        let err = collect_inputs(&tool, &submission).unwrap_err();
        assert!(matches!(err, FormError::InvalidOption { ref field, .. } if field == "operation"));
        assert!(err.to_string().contains("encode, decode"));
    }

    #[test]
    fn test_number_out_of_range() {
        let tool = builtin("compress-image");
        let submission = FormSubmission::new()
            .field("quality", "250")
            .file("imageFile", FileHandle::new("a.png", vec![]));
        let err = collect_inputs(&tool, &submission).unwrap_err();
        assert!(matches!(err, FormError::OutOfRange { value, .. } if value == 250.0));
    }

    // ==================== Dispatch ====================

    #[tokio::test]
    async fn test_unknown_logic_module() {
        let err = dispatch("nope", Inputs::new()).await.unwrap_err();
        assert!(matches!(err, RunError::Dispatch(_)));
        assert_eq!(err.to_string(), "Unknown logic module: nope");
    }

    #[tokio::test]
    async fn test_runner_reports_unknown_module() {
        let tool = ToolDescriptor::from_json(r#"{
            "id": "ghost", "title": "Ghost", "description": "",
            "inputs": [{"id": "text", "type": "text", "label": "Text"}],
            "outputs": [{"id": "result", "type": "text", "label": "Result"}],
            "logic": "doesNotExist"
        }"#).unwrap();
        let runner = ToolRunner::new(tool);
        let mut state = FormState::new();
        state.set("text", "abc");

        let result = runner.submit(&mut state).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown logic module: doesNotExist"));
        assert!(result.outputs.is_empty());
        assert!(state.result.is_none());
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Unknown logic module: doesNotExist"));
    }

    // ==================== Text Counter ====================

    #[tokio::test]
    async fn test_text_counter_empty_text() {
        let inputs = Inputs::new()
            .with("text", InputValue::Text(String::new()))
            .with("includeSpaces", InputValue::Bool(true));
        let outputs = dispatch("textCounter", inputs).await.unwrap();
        let stats = &outputs["statistics"];
        for key in ["characters", "charactersNoSpaces", "words", "lines", "paragraphs",
                    "chineseCharacters", "englishWords", "numbers", "punctuation"] {
            assert_eq!(stats[key], json!(0), "{key} should be zero");
        }
    }

    #[tokio::test]
    async fn test_text_counter_through_runner() {
        let runner = ToolRunner::new(builtin("text-counter"));
        let mut state = FormState::new();
        state.set("text", "Hello world\n\nSecond 42.");

        let result = runner.submit(&mut state).await;
        assert!(result.success, "{:?}", result.error);
        let stats = &result.outputs["statistics"];
        assert_eq!(stats["paragraphs"], json!(2));
        assert_eq!(stats["lines"], json!(3));
        assert_eq!(stats["numbers"], json!(2));
        assert_eq!(stats["englishWords"], json!(3));
    }

    // ==================== URL Encoder ====================

    #[tokio::test]
    async fn test_url_round_trip_via_reverse_flow() {
        let tool = builtin("url-encoder");
        let runner = ToolRunner::new(tool.clone());
        let mut state = FormState::new();
        state.set("inputText", "a b/c");

        let encoded = runner.submit(&mut state).await;
        assert!(encoded.success);
        assert_eq!(encoded.outputs["result"], json!("a%20b%2Fc"));
        assert_eq!(encoded.outputs["details"]["operation"], json!("encode"));

        let updated = state.use_as_input(&tool, "result", &encoded.outputs["result"]);
        assert_eq!(updated.as_deref(), Some("inputText"));
        assert_eq!(state.values["inputText"], "a%20b%2Fc");

        state.set("operation", "decode");
        let decoded = runner.submit(&mut state).await;
        assert!(decoded.success);
        assert_eq!(decoded.outputs["result"], json!("a b/c"));
    }

    #[tokio::test]
    async fn test_url_decode_failure_keeps_text() {
        let runner = ToolRunner::new(builtin("url-encoder"));
        let mut state = FormState::new();
        state.set("inputText", "100%zz");
        state.set("operation", "decode");

        let result = runner.submit(&mut state).await;
        assert!(result.success);
        assert_eq!(result.outputs["result"], json!("100%zz"));
        let errors = result.outputs["details"]["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].as_str().unwrap().starts_with("Decode failed"));
    }

    // ==================== Image Compression ====================

    #[tokio::test]
    async fn test_compress_image_caps_width() {
        let original = png(400, 200);
        let runner = ToolRunner::new(builtin("compress-image"));
        let mut state = FormState::new();
        state.files.insert("imageFile".into(), FileHandle::new("photo.png", original.clone()));
        state.set("quality", "60");
        state.set("maxWidth", "100");

        let result = runner.submit(&mut state).await;
        assert!(result.success, "{:?}", result.error);

        let info = &result.outputs["compressionInfo"];
        assert_eq!(info["originalSize"], json!(original.len()));
        assert_eq!(info["originalDimensions"], json!({"width": 400, "height": 200}));
        assert_eq!(info["compressedDimensions"], json!({"width": 100, "height": 50}));
        assert_eq!(info["format"], json!("image/jpeg"));

        let url = result.outputs["compressedImage"].as_str().unwrap();
        let decoded = data_url::decode(url).unwrap();
        assert_eq!(decoded.mime, "image/jpeg");
        assert_eq!(info["compressedSize"], json!(decoded.bytes.len()));
        assert_eq!(
            info["compressionRatio"],
            json!(compression_ratio(original.len(), decoded.bytes.len()))
        );
    }

    #[tokio::test]
    async fn test_compress_image_without_max_width_keeps_size() {
        let runner = ToolRunner::new(builtin("compress-image"));
        let mut state = FormState::for_descriptor(runner.descriptor());
        state.files.insert("imageFile".into(), FileHandle::new("photo.png", png(64, 48)));

        let result = runner.submit(&mut state).await;
        assert!(result.success, "{:?}", result.error);
        let info = &result.outputs["compressionInfo"];
        assert_eq!(info["compressedDimensions"], json!({"width": 64, "height": 48}));
        assert_eq!(info["originalDimensions"], info["compressedDimensions"]);
    }

    #[tokio::test]
    async fn test_compress_image_wider_cap_is_noop() {
        let runner = ToolRunner::new(builtin("compress-image"));
        let mut state = FormState::for_descriptor(runner.descriptor());
        state.files.insert("imageFile".into(), FileHandle::new("photo.png", png(40, 20)));
        state.set("maxWidth", "1000");

        let result = runner.submit(&mut state).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.outputs["compressionInfo"]["compressedDimensions"], json!({"width": 40, "height": 20}));
    }

    #[tokio::test]
    async fn test_compress_image_rejects_garbage() {
        let runner = ToolRunner::new(builtin("compress-image"));
        let mut state = FormState::new();
        state.files.insert("imageFile".into(), FileHandle::new("x.png", b"not an image".to_vec()));

        let result = runner.submit(&mut state).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Failed to load image"));
    }

    // ==================== Reverse Mapping ====================

    #[test]
    fn test_reverse_mapping_only_touches_target() {
        let tool = builtin("url-encoder");
        let mut state = FormState::new();
        state.set("inputText", "old");
        state.set("operation", "decode");

        let updated = state.use_as_input(&tool, "result", &json!({"result": "new"}));
        assert_eq!(updated.as_deref(), Some("inputText"));
        assert_eq!(state.values["inputText"], "new");
        assert_eq!(state.values["operation"], "decode");
    }

    #[test]
    fn test_reverse_mapping_noop_cases() {
        let tool = builtin("url-encoder");
        let mut state = FormState::new();
        state.set("inputText", "keep");

        assert_eq!(state.use_as_input(&tool, "details", &json!("x")), None);
        assert_eq!(state.values["inputText"], "keep");

        assert_eq!(state.use_as_input(&tool, "result", &Value::Null), None);
        assert_eq!(state.values["inputText"], "keep");

        let mut irreversible = tool.clone();
        irreversible.reversible = false;
        assert_eq!(state.use_as_input(&irreversible, "result", &json!("x")), None);
        assert_eq!(state.values["inputText"], "keep");
    }

    // ==================== Rendering ====================

    fn output(id: &str, kind: &str) -> OutputField {
        serde_json::from_value(json!({"id": id, "type": kind, "label": id})).unwrap()
    }

    #[test]
    fn test_render_missing_value() {
        let rendered = render::render_field(&output("stats", "json"), None);
        assert_eq!(rendered.body, "No data");
        assert!(rendered.download.is_none());
    }

    #[test]
    fn test_render_json_table() {
        let value = json!({"characters": 5, "words": 1});
        let rendered = render::render_field(&output("stats", "json"), Some(&value));
        let first = rendered.body.lines().next().unwrap();
        assert!(first.starts_with("characters"));
        assert!(first.ends_with('5'));
        assert!(rendered.body.contains("\"words\": 1"));
    }

    #[test]
    fn test_render_table_uses_first_row_keys() {
        let value = json!([{"name": "a", "size": 1}, {"name": "bb", "extra": true}]);
        let rendered = render::render_field(&output("rows", "table"), Some(&value));
        let lines: Vec<&str> = rendered.body.lines().collect();
        assert_eq!(lines[0], "name | size");
        assert_eq!(lines.len(), 4);
        assert!(!rendered.body.contains("extra"));
    }

    #[test]
    fn test_render_table_blanks_falsy_cells() {
        let value = json!([{"name": "a", "count": 0, "ok": false}, {"name": "", "count": 3, "ok": true}]);
        let rendered = render::render_field(&output("rows", "table"), Some(&value));
        let lines: Vec<&str> = rendered.body.lines().collect();
        assert_eq!(lines[0], "count | name | ok");
        assert_eq!(lines[2], "      | a");
        assert_eq!(lines[3], "3     |      | true");
    }

    #[test]
    fn test_render_plain_text_fallback() {
        let rendered = render::render_field(&output("pic", "image"), Some(&json!(12)));
        assert_eq!(rendered.body, "12");
        assert!(rendered.download.is_none());
    }

    #[test]
    fn test_render_marks_reversible_outputs() {
        let tool = builtin("url-encoder");
        let mut outputs = toolbox::Outputs::new();
        outputs.insert("result".into(), json!("a%20b"));
        let fields = render::render_result(&tool, &outputs);
        assert_eq!(fields.len(), 2);
        assert!(fields[0].reversible);
        assert!(!fields[1].reversible);
        assert_eq!(fields[1].body, "No data");
    }

    #[tokio::test]
    async fn test_save_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let url = data_url::encode("image/jpeg", &[0xff, 0xd8, 0xff]);
        let fields = vec![
            render::render_field(&output("compressedImage", "image"), Some(&Value::String(url))),
            render::render_field(&output("note", "text"), Some(&json!("hi"))),
        ];
        assert_eq!(fields[0].download.as_ref().unwrap().file_name, "compressedImage.jpg");

        let saved = render::save_downloads(&fields, dir.path()).await.unwrap();
        assert_eq!(saved, vec![dir.path().join("compressedImage.jpg")]);
        assert_eq!(std::fs::read(&saved[0]).unwrap(), vec![0xff, 0xd8, 0xff]);
    }

    // ==================== Content Catalog ====================

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 3);
        for tool in catalog.list() {
            let key = tool.logic.as_deref().unwrap();
            assert!(toolbox::logic::resolve(key).is_ok(), "{key} should resolve");
        }

        let names: Vec<&str> = toolbox::logic::all_logic().iter().map(|m| m.name()).collect();
        assert_eq!(names, ["compressImage", "textCounter", "urlEncoder"]);
        assert!(toolbox::logic::all_logic().iter().all(|m| !m.description().is_empty()));
    }

    #[tokio::test]
    async fn test_load_dir_rejects_invalid_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"id": "a", "title": "A", "description": "", "inputs": [], "outputs": [], "logic": "textCounter"}"#).unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"id": "b", "title": ""}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let err = Catalog::load_dir(dir.path()).await.unwrap_err();
        assert!(matches!(err, content::ContentError::Descriptor { ref path, .. } if path.ends_with("b.json")));
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let text = std::fs::read_to_string(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("content/tools/text-counter.json"),
        ).unwrap();
        std::fs::write(dir.path().join("copy.json"), text).unwrap();

        let extra = Catalog::load_dir(dir.path()).await.unwrap();
        assert_eq!(extra.len(), 1);
        let mut catalog = Catalog::builtin().unwrap();
        let err = catalog.merge(extra).unwrap_err();
        assert!(matches!(err, content::ContentError::Duplicate(ref id) if id == "text-counter"));
        assert_eq!(catalog.len(), 3);
    }

    // ==================== Descriptors ====================

    #[test]
    fn test_descriptor_validation() {
        let bad_mapping = r#"{
            "id": "t", "title": "T", "description": "",
            "inputs": [{"id": "a", "type": "text", "label": "A"}],
            "outputs": [{"id": "b", "type": "text", "label": "B"}],
            "logic": "textCounter",
            "reversible": true,
            "reverseMapping": [{"from": "b", "to": "missing"}]
        }"#;
        assert!(ToolDescriptor::from_json(bad_mapping).unwrap_err().to_string().contains("missing"));

        let no_logic = r#"{"id": "t", "title": "T", "description": "", "inputs": [], "outputs": []}"#;
        assert!(ToolDescriptor::from_json(no_logic).unwrap_err().to_string().contains("logic"));

        let empty_select = r#"{
            "id": "t", "title": "T", "description": "",
            "inputs": [{"id": "op", "type": "select", "label": "Op"}],
            "outputs": [], "logic": "urlEncoder"
        }"#;
        assert!(ToolDescriptor::from_json(empty_select).is_err());
        assert!(ToolDescriptor::from_json("{ not json").is_err());
    }

    // ==================== Plugins ====================

    #[tokio::test]
    async fn test_sample_plugin_runs() {
        let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("plugins/sample.json");
        let loaded = plugin::load_plugin(src.to_str(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(loaded.descriptor.id, "sample");
        assert_eq!(loaded.handler.name(), "reverseText");

        let runner = loaded.into_runner();
        let mut state = FormState::new();
        state.set("text", "héllo");
        let result = runner.submit(&mut state).await;
        assert!(result.success);
        assert_eq!(result.outputs["result"], json!("olléh"));
    }

    #[tokio::test]
    async fn test_plugin_missing_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, r#"{"id": "p", "title": "P", "description": "", "inputs": [], "outputs": []}"#).unwrap();

        let err = plugin::load_plugin(path.to_str(), Duration::from_secs(5)).await.err().unwrap();
        assert_eq!(err.to_string(), "Invalid plugin: missing run function");

        std::fs::write(&path, r#"{"id": "p", "title": "P", "description": "", "inputs": [], "outputs": [], "run": "formatDisk"}"#).unwrap();
        let err = plugin::load_plugin(path.to_str(), Duration::from_secs(5)).await.err().unwrap();
        assert!(matches!(err, plugin::PluginError::MissingRun));
    }

    /// Serve one HTTP response on a local port; returns the plugin URL
    async fn serve_once(status: &'static str, body: String) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/plugins/sample.json")
    }

    #[tokio::test]
    async fn test_plugin_over_http() {
        let body = std::fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("plugins/sample.json")).unwrap();
        let url = serve_once("200 OK", body).await;

        let loaded = plugin::load_plugin(Some(&url), Duration::from_secs(5)).await.unwrap();
        assert_eq!(loaded.src, url);
        assert_eq!(loaded.descriptor.id, "sample");

        let runner = loaded.into_runner();
        let mut state = FormState::new();
        state.set("text", "abc");
        assert_eq!(runner.submit(&mut state).await.outputs["result"], json!("cba"));
    }

    #[tokio::test]
    async fn test_plugin_http_error_status() {
        let url = serve_once("404 Not Found", "{}".to_string()).await;

        let err = plugin::load_plugin(Some(&url), Duration::from_secs(5)).await.err().unwrap();
        match err {
            plugin::PluginError::Fetch { src, reason } => {
                assert_eq!(src, url);
                assert!(reason.contains("404"), "{reason}");
            }
            other => panic!("expected fetch error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_plugin_source_errors() {
        let err = plugin::load_plugin(None, Duration::from_secs(5)).await.err().unwrap();
        assert!(matches!(err, plugin::PluginError::MissingSource));

        let err = plugin::load_plugin(Some("/nonexistent/plugin.json"), Duration::from_secs(5)).await.err().unwrap();
        assert!(matches!(err, plugin::PluginError::Fetch { .. }));
    }
}
