/// Headless Fiji backend
///
/// Fiji has no API we can link against, so every operation is written as
/// an ImageJ macro statement. An open image is just the list of
/// statements that produce it; `save` appends the `saveAs` call and hands
/// the whole script to `ImageJ --headless --console -macro`.
///
/// All ImageJ option strings are built in this file and nowhere else.

use super::{EngineError, ImageEngine, StitchRequest};
use crate::config::{BackgroundParams, ComputationMode, FusionMethod, StitchParams};
use crate::tiles::TileGrid;
use log::debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// How many trailing lines of Fiji output to keep in error messages
const OUTPUT_TAIL_LINES: usize = 20;

/// Fiji launcher inside a `Fiji.app` folder, per platform
fn launcher_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "ImageJ-win64.exe"
    } else if cfg!(target_os = "macos") {
        "Contents/MacOS/ImageJ-macosx"
    } else {
        "ImageJ-linux64"
    }
}

/// An image that exists only as the macro statements producing it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroImage {
    statements: Vec<String>,
}

impl MacroImage {
    fn push(&mut self, statement: String) {
        self.statements.push(statement);
    }

    /// Statements queued so far
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Full macro that writes this image to `path`
    pub fn script_for(&self, path: &Path) -> String {
        let mut lines = Vec::with_capacity(self.statements.len() + 3);
        lines.push("setBatchMode(true);".to_string());
        lines.extend(self.statements.iter().cloned());
        lines.push(format!(
            "saveAs(\"Tiff\", {});",
            quote(&path.to_string_lossy())
        ));
        lines.push("close(\"*\");".to_string());
        lines.join("\n") + "\n"
    }
}

/// Fiji/ImageJ driven as a headless subprocess
#[derive(Debug, Clone)]
pub struct FijiEngine {
    executable: PathBuf,
}

impl FijiEngine {
    /// Use the given Fiji launcher
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Use `explicit` if given, otherwise `~/Fiji.app/<launcher>`
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self, EngineError> {
        let executable = match explicit {
            Some(path) => path,
            None => {
                let home = dirs::home_dir()
                    .ok_or_else(|| EngineError::Other("cannot determine home directory".into()))?;
                home.join("Fiji.app").join(launcher_name())
            }
        };

        if !executable.is_file() {
            return Err(EngineError::NotFound(executable));
        }

        Ok(Self::new(executable))
    }

    /// Path of the launcher this engine runs
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Run one macro to completion
    fn run_macro(&self, script: &str) -> Result<(), EngineError> {
        let mut file = tempfile::Builder::new()
            .prefix("tilestitch-")
            .suffix(".ijm")
            .tempfile()
            .map_err(EngineError::Script)?;
        file.write_all(script.as_bytes())
            .and_then(|_| file.flush())
            .map_err(EngineError::Script)?;

        debug!("Running Fiji macro:\n{}", script);

        let output = Command::new(&self.executable)
            .arg("--headless")
            .arg("--console")
            .arg("-macro")
            .arg(file.path())
            .output()
            .map_err(|source| EngineError::Launch {
                program: self.executable.clone(),
                source,
            })?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        // Macro errors are printed but do not always set the exit code
        if !output.status.success() || combined.contains("Macro Error") {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                output: tail(&combined, OUTPUT_TAIL_LINES),
            });
        }

        Ok(())
    }
}

impl ImageEngine for FijiEngine {
    type Image = MacroImage;

    fn open(&self, path: &Path) -> Result<MacroImage, EngineError> {
        let mut image = MacroImage::default();
        image.push(format!("open({});", quote(&path.to_string_lossy())));
        Ok(image)
    }

    fn subtract_background(
        &self,
        image: &mut MacroImage,
        params: &BackgroundParams,
    ) -> Result<(), EngineError> {
        image.push(format!(
            "run(\"Subtract Background...\", {});",
            quote(&subtract_background_options(params))
        ));
        Ok(())
    }

    fn stitch(&self, request: &StitchRequest<'_>) -> Result<MacroImage, EngineError> {
        // The plugin reads bracketed values up to the first `]`, with no escape
        if request.directory.to_string_lossy().contains(['[', ']']) {
            return Err(EngineError::UnsupportedPath {
                path: request.directory.to_path_buf(),
                reason: "the stitching plugin cannot read folder names containing '[' or ']'",
            });
        }

        let mut image = MacroImage::default();
        image.push(format!(
            "run(\"Grid/Collection stitching\", {});",
            quote(&stitching_options(request.directory, request.grid, request.params))
        ));
        Ok(image)
    }

    fn to_rgb(&self, image: &mut MacroImage) -> Result<(), EngineError> {
        image.push("run(\"RGB Color\");".to_string());
        Ok(())
    }

    fn save(&self, image: MacroImage, path: &Path) -> Result<(), EngineError> {
        // A file left by an earlier run must not pass the check below
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed previous {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(EngineError::StaleOutput {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        self.run_macro(&image.script_for(path))?;

        if !path.is_file() {
            return Err(EngineError::MissingOutput(path.to_path_buf()));
        }
        Ok(())
    }
}

/// Quote a string as an ImageJ macro string literal
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Option string for `Subtract Background...`
pub fn subtract_background_options(params: &BackgroundParams) -> String {
    let mut options = format!("rolling={}", params.rolling_ball_radius);
    if params.light_background {
        options.push_str(" light");
    }
    options
}

fn fusion_label(fusion: FusionMethod) -> &'static str {
    match fusion {
        FusionMethod::LinearBlending => "Linear Blending",
        FusionMethod::Average => "Average",
        FusionMethod::Median => "Median",
        FusionMethod::MaxIntensity => "Max. Intensity",
        FusionMethod::MinIntensity => "Min. Intensity",
        FusionMethod::RandomTile => "Intensity of random input tile",
    }
}

fn computation_label(mode: ComputationMode) -> &'static str {
    match mode {
        ComputationMode::SaveMemory => "Save memory (but be slower)",
        ComputationMode::SaveTime => "Save computation time (but use more RAM)",
    }
}

/// Option string for `Grid/Collection stitching` in filename-defined mode
pub fn stitching_options(directory: &Path, grid: TileGrid, params: &StitchParams) -> String {
    // The padded order label is the plugin's literal choice text
    let mut options = vec![
        "type=[Filename defined position]".to_string(),
        "order=[Defined by filename         ]".to_string(),
        format!("grid_size_x={}", grid.width),
        format!("grid_size_y={}", grid.height),
        format!("tile_overlap={}", params.tile_overlap_percent),
        format!("first_file_index_x={}", params.first_index_x),
        format!("first_file_index_y={}", params.first_index_y),
        format!("directory=[{}]", directory.to_string_lossy()),
        format!("file_names={}", params.file_pattern),
        format!("output_textfile_name={}", params.output_textfile_name),
        format!("fusion_method=[{}]", fusion_label(params.fusion)),
        format!("regression_threshold={:.2}", params.regression_threshold),
        format!(
            "max/avg_displacement_threshold={:.2}",
            params.max_avg_displacement_threshold
        ),
        format!(
            "absolute_displacement_threshold={:.2}",
            params.absolute_displacement_threshold
        ),
    ];

    if params.compute_overlap {
        options.push("compute_overlap".to_string());
    }

    options.push(format!(
        "computation_parameters=[{}]",
        computation_label(params.computation)
    ));
    options.push("image_output=[Fuse and display]".to_string());

    options.join(" ")
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
