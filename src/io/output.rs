//! Writing computed fields and arrow geometry to file.

use super::{
    utils::{self, AtomicOutputPath},
    OverwriteMode, Verbosity,
};
use crate::{
    field::{arrows::ArrowGeometry, ffl, FieldResult},
    geometry::{
        Dim3::{X, Y, Z},
        Point3, Vec3,
    },
};
use std::{
    io::{self, BufWriter, Write},
    path::Path,
};

#[cfg(feature = "json")]
use serde::Serialize;

/// Formats available for field output files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    #[cfg(feature = "json")]
    Json,
}

impl OutputFormat {
    /// Determines the output format from the extension of the given path.
    pub fn from_path(file_path: &Path) -> io::Result<Self> {
        match file_path.extension().and_then(|ext| ext.to_str()) {
            Some("csv") => Ok(Self::Csv),
            #[cfg(feature = "json")]
            Some("json") => Ok(Self::Json),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Unsupported output format for {} (supported extensions: {})",
                    file_path.display(),
                    Self::supported_extensions().join(", ")
                ),
            )),
        }
    }

    pub fn supported_extensions() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut extensions = vec!["csv"];
        #[cfg(feature = "json")]
        extensions.push("json");
        extensions
    }
}

fn verify_alignment(points: &[Point3<ffl>], vectors: &[Vec3<ffl>]) -> io::Result<()> {
    if points.len() == vectors.len() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Got {} sample points but {} field vectors",
                points.len(),
                vectors.len()
            ),
        ))
    }
}

/// Writes the given field as CSV, one `x,y,z,vx,vy,vz` row per sample point.
///
/// Vector components are converted to the display unit selected by
/// `show_gauss`. The first line is a comment naming the columns.
pub fn write_field_csv<W: Write>(
    writer: &mut W,
    points: &[Point3<ffl>],
    result: &FieldResult,
    show_gauss: bool,
) -> io::Result<()> {
    let vectors = result.vectors();
    verify_alignment(points, vectors)?;
    let symbol = result.field_type().symbol();
    let (unit, factor) = result.field_type().units(show_gauss);

    writeln!(
        writer,
        "# x,y,z,{0}x [{1}],{0}y [{1}],{0}z [{1}]",
        symbol, unit
    )?;
    for (point, vector) in points.iter().zip(vectors) {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            point[X],
            point[Y],
            point[Z],
            vector[X] * factor,
            vector[Y] * factor,
            vector[Z] * factor
        )?;
    }
    Ok(())
}

#[cfg(feature = "json")]
#[derive(Serialize)]
struct FieldExport<'a> {
    field_type: &'static str,
    unit: &'static str,
    total_calculations: u64,
    total_skipped_calculations: u64,
    points: &'a [Point3<ffl>],
    vectors: Vec<Vec3<ffl>>,
}

/// Writes the given field as a JSON object holding the sample points, the
/// vectors in display units, the unit label and the calculation counts.
#[cfg(feature = "json")]
pub fn write_field_json<W: Write>(
    writer: &mut W,
    points: &[Point3<ffl>],
    result: &FieldResult,
    show_gauss: bool,
) -> io::Result<()> {
    verify_alignment(points, result.vectors())?;
    let (unit, factor) = result.field_type().units(show_gauss);
    let export = FieldExport {
        field_type: result.field_type().symbol(),
        unit,
        total_calculations: result.total_calculations(),
        total_skipped_calculations: result.total_skipped_calculations(),
        points,
        vectors: result
            .vectors()
            .iter()
            .map(|vector| *vector * factor)
            .collect(),
    };
    serde_json::to_writer(&mut *writer, &export)?;
    writeln!(writer)
}

/// Writes arrow geometry as CSV, one row per arrow holding the start point,
/// the end point and the head point.
pub fn write_arrows_csv<W: Write>(writer: &mut W, arrows: &ArrowGeometry) -> io::Result<()> {
    writeln!(
        writer,
        "# start_x,start_y,start_z,end_x,end_y,end_z,head_x,head_y,head_z"
    )?;
    for (line_pair, head) in arrows.line_pairs.chunks(2).zip(&arrows.head_points) {
        let (start, end) = (&line_pair[0], &line_pair[1]);
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{}",
            start[X], start[Y], start[Z], end[X], end[Y], end[Z], head[X], head[Y], head[Z]
        )?;
    }
    Ok(())
}

/// Writes to the given path through a temporary file that is moved into
/// place once writing succeeded.
///
/// # Returns
///
/// A `Result` which is either:
///
/// - `Ok`: Contains `true` if the file was written, or `false` if an existing
///   file was kept because of the overwrite mode.
/// - `Err`: Contains an error encountered while trying to write the file.
pub fn save_atomically<P, F>(
    output_file_path: P,
    overwrite_mode: OverwriteMode,
    verbosity: &Verbosity,
    write: F,
) -> io::Result<bool>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<std::fs::File>) -> io::Result<()>,
{
    let atomic_output_path = AtomicOutputPath::new(output_file_path)?;
    if !atomic_output_path.write_allowed(overwrite_mode)? {
        if verbosity.print_messages() {
            println!(
                "Keeping existing {}",
                atomic_output_path.target_path().display()
            );
        }
        return Ok(false);
    }
    if verbosity.print_messages() {
        println!("Writing {}", atomic_output_path.target_path().display());
    }

    let file = utils::create_file_and_map_err(atomic_output_path.temporary_path())?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush()?;
    drop(writer);

    atomic_output_path.perform_replace()?;
    Ok(true)
}

/// Saves the given field to the given path, in the format given by the
/// file extension.
pub fn save_field<P: AsRef<Path>>(
    output_file_path: P,
    points: &[Point3<ffl>],
    result: &FieldResult,
    show_gauss: bool,
    overwrite_mode: OverwriteMode,
    verbosity: &Verbosity,
) -> io::Result<bool> {
    let output_file_path = output_file_path.as_ref();
    let format = OutputFormat::from_path(output_file_path)?;
    save_atomically(output_file_path, overwrite_mode, verbosity, |writer| {
        match format {
            OutputFormat::Csv => write_field_csv(writer, points, result, show_gauss),
            #[cfg(feature = "json")]
            OutputFormat::Json => write_field_json(writer, points, result, show_gauss),
        }
    })
}

/// Saves the given arrow geometry as CSV to the given path.
pub fn save_arrows<P: AsRef<Path>>(
    output_file_path: P,
    arrows: &ArrowGeometry,
    overwrite_mode: OverwriteMode,
    verbosity: &Verbosity,
) -> io::Result<bool> {
    save_atomically(output_file_path, overwrite_mode, verbosity, |writer| {
        write_arrows_csv(writer, arrows)
    })
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        field::{backend::InterruptionFlag, Field},
        sampling::{manual::ManualSamplingVolume, SamplingVolume},
        wire::presets,
    };
    use std::fs;

    fn computed_field(points: &[Point3<ffl>]) -> Field {
        let wire = presets::straight_line(2.0, 0.5, 1.0).unwrap();
        let volume = ManualSamplingVolume::in_vacuum(points.to_vec());
        let mut field = Field::default();
        field
            .recalculate(&wire, &volume, &|_| {}, &InterruptionFlag::new(), 1)
            .unwrap();
        field
    }

    #[test]
    fn csv_has_one_row_per_point_in_order() {
        let points = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.5),
            Point3::new(-3.0, 0.0, 1.0),
        ];
        let field = computed_field(&points);
        let mut buffer = Vec::new();
        write_field_csv(&mut buffer, &points, field.result().unwrap(), true).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with('#'));
        assert!(lines[0].contains("[Gs]"));
        assert!(lines[2].starts_with("0,2,0.5,"));

        let reread = ManualSamplingVolume::from_csv_reader(
            text.lines()
                .map(|line| line.splitn(4, ',').take(3).collect::<Vec<_>>().join(","))
                .collect::<Vec<_>>()
                .join("\n")
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(reread.points(), points.as_slice());
    }

    #[test]
    fn existing_file_is_kept_when_overwrite_is_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.csv");
        fs::write(&path, "old").unwrap();

        let points = vec![Point3::new(1.0, 0.0, 0.0)];
        let field = computed_field(&points);
        let written = save_field(
            &path,
            &points,
            field.result().unwrap(),
            false,
            OverwriteMode::Never,
            &Verbosity::Quiet,
        )
        .unwrap();
        assert!(!written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");

        let written = save_field(
            &path,
            &points,
            field.result().unwrap(),
            false,
            OverwriteMode::Always,
            &Verbosity::Quiet,
        )
        .unwrap();
        assert!(written);
        assert!(fs::read_to_string(&path).unwrap().starts_with("# x,y,z,Bx [T]"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(OutputFormat::from_path(Path::new("field.txt")).is_err());
        assert_eq!(
            OutputFormat::from_path(Path::new("out/field.csv")).unwrap(),
            OutputFormat::Csv
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_contains_unit_and_counts() {
        let points = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let field = computed_field(&points);
        let mut buffer = Vec::new();
        write_field_json(&mut buffer, &points, field.result().unwrap(), false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["unit"], "T");
        assert_eq!(value["field_type"], "B");
        assert_eq!(value["total_calculations"], 8);
        assert_eq!(value["vectors"].as_array().unwrap().len(), 2);
    }
}
