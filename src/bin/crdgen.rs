//! Generate the Hostproxy CRD YAML from the Rust types.
//!
//! Usage:
//!   cargo run --bin crdgen                        # stdout
//!   cargo run --bin crdgen -- --out-dir ./crds    # writes hostproxy-crd.yaml

use std::path::PathBuf;

use kube::CustomResourceExt;

use hostproxy_operator::crd::hostproxy::Hostproxy;

fn main() -> anyhow::Result<()> {
    let out_dir: Option<PathBuf> = std::env::args()
        .skip_while(|a| a != "--out-dir")
        .nth(1)
        .map(PathBuf::from);

    let yaml = serde_yaml::to_string(&Hostproxy::crd())?;

    match out_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let path = dir.join("hostproxy-crd.yaml");
            std::fs::write(&path, format!("---\n{yaml}"))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("---\n{yaml}"),
    }
    Ok(())
}
