use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

/// Stand-in `nft` executable that records its arguments and stdin and
/// answers with canned output.
pub struct FakeNft {
    dir: TempDir,
}

impl FakeNft {
    pub fn succeeding(stdout: &str) -> Self {
        Self::new(stdout, "", 0)
    }

    pub fn failing(stderr: &str) -> Self {
        Self::new("", stderr, 1)
    }

    pub fn new(stdout: &str, stderr: &str, exit_code: i32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();

        fs::write(dir.path().join("stdout"), stdout).unwrap();
        fs::write(dir.path().join("stderr"), stderr).unwrap();

        let script = format!(
            "#!/bin/sh\n\
             echo \"$@\" > \"{root}/args\"\n\
             cat > \"{root}/stdin\"\n\
             cat \"{root}/stdout\"\n\
             cat \"{root}/stderr\" >&2\n\
             exit {exit_code}\n"
        );
        let path = dir.path().join("nft");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("nft")
    }

    pub fn args(&self) -> String {
        fs::read_to_string(self.dir.path().join("args"))
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    pub fn stdin(&self) -> String {
        fs::read_to_string(self.dir.path().join("stdin")).unwrap_or_default()
    }

    pub fn was_called(&self) -> bool {
        self.dir.path().join("args").exists()
    }
}
