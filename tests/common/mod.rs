#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Catalog header row as the tool writes it.
pub const CATALOG_HEADER: &str = "id,nombre,bodega,enologo,anada,uva_principal,composicion_blend,gama,procedencia,detalle,nota_cata,ubicacion,anio_limite,puntuacion,imagen_data,tipo_imagen";

/// Scratch directory holding a catalog, a config and any input files. Cleans
/// up on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory with a config that never waits
    /// between read attempts.
    pub fn new() -> Self {
        let workspace = Self {
            temp_dir: tempdir().expect("temp dir"),
        };
        workspace.write("vinoteca.yaml", "read_backoff_ms: []\ncache_ttl_secs: 0\n");
        workspace
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.path().join("cava.csv")
    }

    /// Seeds the catalog with data rows below the standard header.
    pub fn seed_catalog(&self, rows: &[&str]) -> PathBuf {
        let mut contents = format!("{CATALOG_HEADER}\n");
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        self.write("cava.csv", &contents)
    }

    pub fn read_catalog(&self) -> String {
        fs::read_to_string(self.catalog_path()).expect("read catalog")
    }

    /// The binary, pointed at this workspace's config and catalog.
    pub fn vinoteca(&self) -> Command {
        let mut cmd = Command::cargo_bin("vinoteca").expect("binary exists");
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.path().join("vinoteca.yaml"))
            .arg("--catalog")
            .arg(self.catalog_path());
        cmd
    }
}

/// A catalog row in the persisted layout with the common columns filled in.
pub fn catalog_row(id: u64, name: &str, winery: &str, grape: &str, location: &str) -> String {
    format!("{id},{name},{winery},,2020,{grape},,,,,,{location},2030,7,,")
}
