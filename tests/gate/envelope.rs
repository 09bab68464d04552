use thalamus::envelope::{Envelope, EnvelopeMeta};

fn meta(model_id: Option<&str>, prompt_digest: Option<&str>) -> EnvelopeMeta {
    EnvelopeMeta {
        model_id: model_id.map(str::to_string),
        prompt_digest: prompt_digest.map(str::to_string),
    }
}

#[test]
fn identical_inputs_produce_identical_ids() {
    let first = Envelope::build("I should mine coal", meta(Some("m1"), Some("d1")));
    let second = Envelope::build("I should mine coal", meta(Some("m1"), Some("d1")));
    assert_eq!(first.envelope_id, second.envelope_id);
    assert!(first.envelope_id.starts_with("env:"));
}

#[test]
fn id_changes_when_text_changes() {
    let first = Envelope::build("I should mine coal", meta(Some("m1"), None));
    let second = Envelope::build("I should mine iron", meta(Some("m1"), None));
    assert_ne!(first.envelope_id, second.envelope_id);
}

#[test]
fn id_changes_when_any_metadata_field_changes() {
    let base = Envelope::build("same text", meta(Some("m1"), Some("d1")));
    let other_model = Envelope::build("same text", meta(Some("m2"), Some("d1")));
    let other_digest = Envelope::build("same text", meta(Some("m1"), Some("d2")));
    let no_meta = Envelope::build("same text", meta(None, None));

    assert_ne!(base.envelope_id, other_model.envelope_id);
    assert_ne!(base.envelope_id, other_digest.envelope_id);
    assert_ne!(base.envelope_id, no_meta.envelope_id);
}

#[test]
fn sanitize_strips_control_characters_only() {
    let envelope = Envelope::build("go\u{0} north\u{7}\r\nthen\tdig", EnvelopeMeta::default());
    assert_eq!(envelope.sanitized_text, "go north\nthen\tdig");
}

#[test]
fn sanitize_never_rewrites_semantic_content() {
    let text = "I should craft a wooden_pickaxe x3 near (10, -4)";
    let envelope = Envelope::build(text, EnvelopeMeta::default());
    assert_eq!(envelope.sanitized_text, text);
}

#[test]
fn sanitization_feeds_the_id() {
    let with_controls = Envelope::build("mine\u{1} coal", EnvelopeMeta::default());
    let clean = Envelope::build("mine coal", EnvelopeMeta::default());
    assert_eq!(with_controls.envelope_id, clean.envelope_id);
}
