use boolpolicy_types::{LeafKind, MetaPath, PathSegment as Seg, SchemaTable};

/// A small deployment schema used across the integration suites.
#[allow(dead_code)]
pub fn deployment_schema() -> SchemaTable {
    SchemaTable::new()
        .with_field("Deployment Name", MetaPath::new(vec![Seg::scalar("name")], LeafKind::String))
        .with_field(
            "Image",
            MetaPath::new(vec![Seg::slice("containers"), Seg::scalar("image")], LeafKind::String),
        )
        .with_field(
            "Container Name",
            MetaPath::new(vec![Seg::slice("containers"), Seg::scalar("name")], LeafKind::String),
        )
        .with_field(
            "Privileged Container",
            MetaPath::new(
                vec![
                    Seg::slice("containers"),
                    Seg::pointer("security_context"),
                    Seg::scalar("privileged"),
                ],
                LeafKind::Bool,
            ),
        )
        .with_field(
            "Environment Variable",
            MetaPath::new(
                vec![Seg::slice("containers"), Seg::slice("env"), Seg::scalar("value")],
                LeafKind::String,
            ),
        )
        .with_field(
            "CVE",
            MetaPath::new(
                vec![
                    Seg::slice("containers"),
                    Seg::slice("components"),
                    Seg::slice("vulns"),
                    Seg::scalar("cve"),
                ],
                LeafKind::String,
            ),
        )
        .with_field(
            "Args",
            MetaPath::new(
                vec![Seg::slice("containers"), Seg::scalar("args")],
                LeafKind::Other("list".into()),
            ),
        )
        .with_field(
            "Image Scan",
            MetaPath::new(
                vec![Seg::slice("containers"), Seg::scalar("scan")],
                LeafKind::Other("scan".into()),
            ),
        )
        .with_field("Required Label", MetaPath::new(vec![Seg::map("labels")], LeafKind::Map))
        .with_field("Replicas", MetaPath::new(vec![Seg::scalar("replicas")], LeafKind::Int))
}

/// A deployment with `containers` x `components` x 3 vulnerabilities, where
/// only the last vulnerability of the last container is `needle`.
#[allow(dead_code)]
pub fn large_deployment(containers: usize, components: usize, needle: &str) -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..containers)
        .map(|c| {
            let components: Vec<serde_json::Value> = (0..components)
                .map(|p| {
                    let vulns: Vec<serde_json::Value> = (0..3)
                        .map(|v| {
                            let last = c + 1 == containers && p + 1 == components && v == 2;
                            let cve = if last {
                                needle.to_string()
                            } else {
                                format!("CVE-2000-{}-{}-{}", c, p, v)
                            };
                            serde_json::json!({ "cve": cve })
                        })
                        .collect();
                    serde_json::json!({ "vulns": vulns })
                })
                .collect();
            serde_json::json!({ "name": format!("c{}", c), "components": components })
        })
        .collect();
    serde_json::json!({ "containers": list })
}
