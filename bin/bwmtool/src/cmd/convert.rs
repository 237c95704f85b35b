use std::io::BufWriter;

use bwm::HashSet;
use bwm::write::BwmWriterSettings;

use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Drop the mesh description at the given index (can repeat)
    #[arg(short, long)]
    drop_mesh: Vec<usize>,
    /// Remove all cleaves
    #[arg(long)]
    drop_cleaves: bool,
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    warg: crate::WriteArgs,
    #[command(flatten)]
    oarg: crate::OutputArgs,
    #[command(flatten)]
    paths: crate::InOutPaths,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &ConvertArgs,
) -> AnyResult<()> {
    let mut model = crate::load_model(&args_cmd.rarg, &args_cmd.paths.in_file)?;

    let drop_meshes: HashSet<_> = args_cmd.drop_mesh.iter().copied().collect();
    if let Some(bad) = drop_meshes.iter().find(|&&i| i >= model.meshes.len()) {
        bail!("No mesh {bad}: file has {} meshes", model.meshes.len());
    }
    model.meshes = std::mem::take(&mut model.meshes)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !drop_meshes.contains(i))
        .map(|(_, m)| m)
        .collect();
    if args_cmd.drop_cleaves {
        model.cleaves.clear();
    }
    if args_common.verbose {
        eprintln!(
            "Writing {} meshes, {} cleaves.",
            model.meshes.len(),
            model.cleaves.len()
        );
    }

    let outpath =
        args_cmd.paths.out_file.as_ref().unwrap_or(&args_cmd.paths.in_file);
    let outfile = crate::create_output(
        outpath,
        args_cmd.oarg.overwrite || args_cmd.paths.out_file.is_none(),
    )?;
    let mut bufout = BufWriter::new(outfile);
    bwm::write::write_to_with_settings(
        BwmWriterSettings::from(&args_cmd.warg),
        &model,
        &mut bufout,
    )
    .context("Cannot encode output file")?;
    Ok(())
}
