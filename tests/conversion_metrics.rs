use std::collections::HashMap;

use htmlconverter::{code_to_html, markdown_to_html, notebook_to_html};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

#[test]
fn conversions_emit_counters_by_kind() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    code_to_html("x = 1\n", Some("python")).expect("code");
    markdown_to_html("*hi*");
    markdown_to_html("**there**");
    notebook_to_html("not json").expect_err("invalid notebook");

    let counters: HashMap<(String, String), u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let DebugValue::Counter(count) = value else {
                return None;
            };
            let key = composite_key.key();
            let kind = key
                .labels()
                .find(|label| label.key() == "kind")
                .map(|label| label.value().to_string())?;
            Some(((key.name().to_string(), kind), count))
        })
        .collect();

    let get = |name: &str, kind: &str| {
        counters
            .get(&(name.to_string(), kind.to_string()))
            .copied()
            .unwrap_or(0)
    };

    assert_eq!(get("htmlconverter_conversions_total", "code"), 1);
    assert_eq!(get("htmlconverter_conversions_total", "markdown"), 2);
    assert_eq!(get("htmlconverter_conversions_total", "notebook"), 1);
    assert_eq!(get("htmlconverter_conversion_failures_total", "notebook"), 1);
    assert_eq!(get("htmlconverter_conversion_failures_total", "code"), 0);
}
