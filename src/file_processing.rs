use anyhow::Context;

/// Raw bytes of an input file.
///
/// Non-empty files are memory-mapped; empty files cannot be mapped on every
/// platform and are represented without a mapping.
pub enum InputBytes {
    Mapped(memmap2::Mmap),
    Empty,
}

impl std::ops::Deref for InputBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            InputBytes::Mapped(mmap) => &mmap[..],
            InputBytes::Empty => &[],
        }
    }
}

/// Checks that the input path exists.
///
/// # Arguments
/// * `path` - Input file or directory.
///
/// # Returns
/// * `anyhow::Result<()>` - Error if the path does not exist.
pub fn check_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(anyhow::anyhow!("Input path does not exist: {}", path.display()));
    }
    Ok(())
}

/// Creates the output directory (and its parents) if needed.
pub fn ensure_dir_exist<P: AsRef<std::path::Path>>(dir: P) -> anyhow::Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}

/// Resolves the list of CSV files to process.
///
/// A file path is returned as-is. For a directory, every regular file with a
/// `.csv` extension (case-insensitive) is returned, sorted by path.
///
/// # Returns
/// * `anyhow::Result<Vec<PathBuf>>` - Files to process; error if a directory has none.
pub fn collect_inputs<P: AsRef<std::path::Path>>(input: P) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let input = input.as_ref();
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut paths = std::fs::read_dir(input)
        .with_context(|| format!("Failed to read directory {}", input.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect::<Vec<_>>();
    paths.sort();

    if paths.is_empty() {
        return Err(anyhow::anyhow!("No .csv files found in {}", input.display()));
    }

    // Output files are named after the stem, so two inputs must not share one.
    let mut stems = std::collections::HashMap::new();
    for path in &paths {
        if let Some(other) = stems.insert(file_stem(path), path) {
            return Err(anyhow::anyhow!(
                "Input files {} and {} would write the same output files",
                other.display(),
                path.display()
            ));
        }
    }
    Ok(paths)
}

/// Opens an input file for zero-copy reading.
pub fn read_input<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<InputBytes> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(InputBytes::Empty);
    }
    // The file must not be truncated while mapped; inputs are read-only here.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(InputBytes::Mapped(mmap))
}

fn file_stem(input: &std::path::Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string())
}

/// Path of the CSV written for `input` and `period` inside `output_dir`.
pub fn output_path_for(
    output_dir: &std::path::Path,
    input: &std::path::Path,
    period: crate::period::Period,
) -> std::path::PathBuf {
    output_dir.join(format!("{}_{}.csv", file_stem(input), period.as_str().to_lowercase()))
}

/// Path of the diagnostics CSV written for `input` inside `output_dir`.
pub fn diagnostics_path_for(output_dir: &std::path::Path, input: &std::path::Path) -> std::path::PathBuf {
    output_dir.join(format!("{}_diagnostics.csv", file_stem(input)))
}
