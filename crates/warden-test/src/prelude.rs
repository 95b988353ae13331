//! Convenience re-exports for consumers of `warden-test`.

pub use crate::fake_sandbox::{FakeCommandHandle, FakePtyHandle, FakeSandbox, FakeSandboxProvider, ProvisionRecord};
pub use crate::fixtures::{
    sample_bundle_dir, sample_manifest, sample_manifest_with_anthropic_key, temp_data_root, temp_vault,
    write_manifest, SAMPLE_MANIFEST_TOML,
};
