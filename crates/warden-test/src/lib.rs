//! Shared fixtures and a local-process fake sandbox for testing the
//! Warden sandbox supervisor without a real microVM backend.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fake_sandbox;
pub mod fixtures;
pub mod prelude;

pub use fake_sandbox::{FakeCommandHandle, FakePtyHandle, FakeSandbox, FakeSandboxProvider, ProvisionRecord};
pub use fixtures::{
    sample_bundle_dir, sample_manifest, sample_manifest_with_anthropic_key, temp_data_root, temp_vault,
    write_manifest, SAMPLE_MANIFEST_TOML,
};
