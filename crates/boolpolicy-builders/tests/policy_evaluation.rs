use boolpolicy_builders::{
    BooleanOperator, EventSource, Policy, PolicyGroup, PolicySection, ValidationError,
};
use boolpolicy_compiler::{compile, Evaluator};
use boolpolicy_types::{LeafKind, MetaPath, PathSegment as Seg, QueryResult, SchemaTable};
use serde_json::{json, Value};

fn schema() -> SchemaTable {
    let container = |rest: Vec<Seg>, leaf| {
        let mut segments = vec![Seg::slice("containers")];
        segments.extend(rest);
        MetaPath::new(segments, leaf)
    };
    let vuln = |field: &str, leaf| {
        container(
            vec![
                Seg::pointer("image"),
                Seg::slice("components"),
                Seg::slice("vulns"),
                Seg::scalar(field),
            ],
            leaf,
        )
    };
    SchemaTable::new()
        .with_field(
            "Image Tag",
            container(vec![Seg::pointer("image"), Seg::scalar("tag")], LeafKind::String),
        )
        .with_field(
            "Privileged",
            container(
                vec![Seg::pointer("security_context"), Seg::scalar("privileged")],
                LeafKind::Bool,
            ),
        )
        .with_field("Label", MetaPath::new(vec![Seg::map("labels")], LeafKind::Map))
        .with_field("CVE", vuln("cve", LeafKind::String))
        .with_field("CVE Suppressed", vuln("suppressed", LeafKind::Bool))
        .with_field(
            "Environment Variable",
            container(vec![Seg::slice("env"), Seg::scalar("compound")], LeafKind::String),
        )
        .with_field(
            "Volume ReadOnly",
            container(vec![Seg::slice("volumes"), Seg::scalar("read_only")], LeafKind::Bool),
        )
        .with_field(
            "Image Scan",
            container(
                vec![Seg::pointer("image"), Seg::scalar("scan")],
                LeafKind::Other("scan".into()),
            ),
        )
        .with_field(
            "Volume Type",
            container(vec![Seg::slice("volumes"), Seg::scalar("type")], LeafKind::String),
        )
}

fn evaluators(policy: &Policy) -> Vec<Evaluator> {
    let schema = schema();
    policy
        .queries()
        .unwrap()
        .iter()
        .map(|q| compile(q, &schema).unwrap())
        .collect()
}

fn violations(policy: &Policy, object: &Value) -> Vec<QueryResult> {
    evaluators(policy)
        .iter()
        .filter_map(|ev| ev.evaluate(object))
        .collect()
}

fn policy(groups: Vec<PolicyGroup>) -> Policy {
    Policy::new("test", vec![PolicySection::new("s", groups)])
}

#[test]
fn test_privileged_container() {
    let p = Policy::from_yaml_str(
        r#"
name: privileged
policySections:
  - sectionName: runtime
    policyGroups:
      - fieldName: Privileged Container
        values:
          - value: "true"
"#,
    )
    .unwrap();

    let object = json!({"containers": [
        {"security_context": {"privileged": false}},
        {"security_context": {"privileged": true}},
    ]});
    let found = violations(&p, &object);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].values_for("Privileged"), vec!["true"]);

    let clean = json!({"containers": [{"security_context": {"privileged": false}}]});
    assert!(violations(&p, &clean).is_empty());
}

#[test]
fn test_sections_are_alternatives() {
    let p = Policy::new(
        "either",
        vec![
            PolicySection::new("tag", vec![PolicyGroup::new("Image Tag", ["latest"])]),
            PolicySection::new(
                "privileged",
                vec![PolicyGroup::new("Privileged Container", ["true"])],
            ),
        ],
    );
    let tagged = json!({"containers": [{"image": {"tag": "LATEST"}}]});
    assert_eq!(violations(&p, &tagged).len(), 1);

    let both = json!({"containers": [
        {"image": {"tag": "latest"}, "security_context": {"privileged": true}}
    ]});
    assert_eq!(violations(&p, &both).len(), 2);

    let neither = json!({"containers": [{"image": {"tag": "1.2"}}]});
    assert!(violations(&p, &neither).is_empty());
}

#[test]
fn test_required_label() {
    let p = policy(vec![PolicyGroup::new("Required Label", ["owner="])]);
    assert_eq!(violations(&p, &json!({"labels": {"app": "web"}})).len(), 1);
    assert_eq!(violations(&p, &json!({"labels": {}})).len(), 1);
    assert!(violations(&p, &json!({"labels": {"owner": "team-a"}})).is_empty());

    let all = policy(vec![PolicyGroup::new("Required Label", ["owner=", "team="])
        .with_operator(BooleanOperator::And)]);
    assert!(violations(&all, &json!({"labels": {"owner": "a"}})).is_empty());
    assert_eq!(violations(&all, &json!({"labels": {"app": "a"}})).len(), 1);

    let any = policy(vec![PolicyGroup::new("Required Label", ["owner=", "team="])]);
    assert_eq!(violations(&any, &json!({"labels": {"owner": "a"}})).len(), 1);
    assert!(violations(&any, &json!({"labels": {"owner": "a", "team": "b"}})).is_empty());
}

#[test]
fn test_suppressed_vulnerabilities_are_ignored() {
    let object = json!({"containers": [{"image": {"components": [
        {"vulns": [
            {"cve": "CVE-2021-1", "suppressed": true},
            {"cve": "CVE-2022-2", "suppressed": false},
        ]},
    ]}}]});

    let suppressed = policy(vec![PolicyGroup::new("CVE", ["CVE-2021-.*"])]);
    assert!(violations(&suppressed, &object).is_empty());

    let open = policy(vec![PolicyGroup::new("CVE", ["cve-2022-2"])]);
    let found = violations(&open, &object);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].values_for("CVE"), vec!["CVE-2022-2"]);
    assert_eq!(found[0].values_for("CVE Suppressed"), vec!["false"]);
}

#[test]
fn test_environment_variable_compound() {
    let p = policy(vec![PolicyGroup::new("Environment Variable", ["RAW=API.KEY="])]);
    let object = |compound: &str| json!({"containers": [{"env": [{"compound": compound}]}]});

    assert_eq!(violations(&p, &object("RAW\tAPI.KEY\tsecret")).len(), 1);
    assert!(violations(&p, &object("RAW\tAPIXKEY\tsecret")).is_empty());
    assert!(violations(&p, &object("SECRET_KEY\tAPI.KEY\t")).is_empty());

    let any_source = policy(vec![PolicyGroup::new("Environment Variable", ["=API.KEY="])]);
    assert_eq!(violations(&any_source, &object("SECRET_KEY\tAPI.KEY\t")).len(), 1);
}

#[test]
fn test_writable_host_mount() {
    let p = policy(vec![PolicyGroup::new("Writable Host Mount", ["true"])]);
    let object = |read_only: bool, kind: &str| {
        json!({"containers": [{"volumes": [
            {"read_only": true, "type": "HostPath"},
            {"read_only": read_only, "type": kind},
        ]}]})
    };

    let found = violations(&p, &object(false, "HostPath"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].values_for("Volume ReadOnly"), vec!["false"]);
    assert!(violations(&p, &object(true, "HostPath")).is_empty());
    assert!(violations(&p, &object(false, "EmptyDir")).is_empty());
}

#[test]
fn test_invalid_policy_never_reaches_compiler() {
    let p = policy(vec![PolicyGroup::new("Privileged Container", ["maybe"])]);
    assert!(p.validate().is_err());
    assert!(p.queries().is_err());
}

#[test]
fn test_unscanned_image() {
    let object = json!({"containers": [
        {"image": {"tag": "a", "scan": {"components": 3}}},
        {"image": {"tag": "b", "scan": null}},
        {"image": {"tag": "c"}},
    ]});

    let unscanned = policy(vec![PolicyGroup::new("Unscanned Image", ["true"])]);
    let found = violations(&unscanned, &object);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].values_for("Image Scan"), vec!["-", "-"]);

    let scanned_only = json!({"containers": [{"image": {"scan": {"components": 3}}}]});
    assert!(violations(&unscanned, &scanned_only).is_empty());

    let scanned = policy(vec![PolicyGroup::new("Unscanned Image", ["false"])]);
    let found = violations(&scanned, &object);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].values_for("Image Scan"), vec!["components=3"]);
}

#[test]
fn test_legacy_policy_is_evaluated_after_upgrade() {
    let p = Policy::from_json_str(
        r#"{"name": "legacy", "fields": {"imageName": {"tag": "latest"}, "privileged": true}}"#,
    )
    .unwrap();
    let container = |tag: &str, privileged: bool| {
        json!({"containers": [{"image": {"tag": tag}, "security_context": {"privileged": privileged}}]})
    };
    assert_eq!(violations(&p, &container("latest", true)).len(), 1);
    assert!(violations(&p, &container("latest", false)).is_empty());
    assert!(violations(&p, &container("1.0", true)).is_empty());
}

#[test]
fn test_runtime_fields_need_a_runtime_policy() {
    let p = policy(vec![PolicyGroup::new("Process Name", ["bash"])]);
    assert!(matches!(p.validate(), Err(ValidationError::NotApplicable { .. })));
    assert!(p.with_event_source(EventSource::DeploymentEvent).validate().is_ok());
}
