use bwm::Model;
use bwm::mesh::StripOffsets;
use bwm::read::BwmReaderSettings;
use bwm::summary::ModelType;

use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Also check that re-encoding reproduces the input byte for byte
    #[arg(long)]
    roundtrip: bool,
    #[command(flatten)]
    inarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &VerifyArgs,
) -> AnyResult<()> {
    let buf = std::fs::read(&args_cmd.inpath.in_file)
        .context("Could not read input file")?;
    let model = bwm::read::decode_with_settings(
        BwmReaderSettings::from(&args_cmd.inarg),
        &buf,
    )
    .context("Cannot decode file")?;
    if args_common.verbose {
        eprintln!("File successfully decoded.");
    }

    model.validate().context("Decoded model is inconsistent")?;
    let mut offsets = StripOffsets::Exact;
    if let Err(e) = extract_faces(&model, offsets) {
        if model.model_type()? != ModelType::Skin {
            return Err(e);
        }
        eprintln!("Error! {:#}", e);
        eprintln!("Warning! Trying again with legacy strip offsets.");
        offsets = StripOffsets::Legacy;
        extract_faces(&model, offsets)?;
    }
    if args_common.verbose && offsets == StripOffsets::Legacy {
        eprintln!("File uses legacy strip offsets.");
    }
    if args_common.verbose {
        eprintln!("Meshes, material refs and faces are consistent.");
    }

    if args_cmd.roundtrip {
        let encoded = bwm::encode(&model).context("Cannot re-encode file")?;
        if encoded != buf {
            let at = encoded
                .iter()
                .zip(buf.iter())
                .position(|(a, b)| a != b)
                .unwrap_or(encoded.len().min(buf.len()));
            bail!(
                "Re-encoded file differs from input at offset {at:#x} ({} vs {} bytes)",
                encoded.len(),
                buf.len()
            );
        }
        if args_common.verbose {
            eprintln!("Re-encoded file is identical.");
        }
    }
    Ok(())
}

fn extract_faces(model: &Model, offsets: StripOffsets) -> AnyResult<()> {
    for i in 0..model.meshes.len() {
        model
            .mesh_faces_with(i, offsets)
            .with_context(|| format!("Cannot extract faces of mesh {i}"))?;
    }
    Ok(())
}
