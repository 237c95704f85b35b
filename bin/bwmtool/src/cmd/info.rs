use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// Dump every decoded record instead of a summary
    #[arg(short, long)]
    full: bool,
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    _args_common: &CommonArgs,
    args_cmd: &InfoArgs,
) -> AnyResult<()> {
    let model = crate::load_model(&args_cmd.rarg, &args_cmd.inpath.in_file)?;

    if args_cmd.full {
        println!("{:#?}", model);
        return Ok(());
    }

    let summary = &model.summary;
    println!("Version: {}", model.version()?.number());
    println!("Type: {:?}", model.model_type()?);
    println!("Bounds: {:?} .. {:?}", summary.box_min, summary.box_max);
    println!("Vertices: {}", model.vertices.len());
    println!("Indices: {}", model.indices.len());
    println!("Strides: {}", model.strides.len());
    for (i, stride) in model.strides.iter().enumerate() {
        println!("  [{i}] {} bytes: {:?}", stride.width(), stride.attributes);
    }
    println!("Materials: {}", model.materials.len());
    for (i, mat) in model.materials.iter().enumerate() {
        println!("  [{i}] type {:?}", mat.material_type.as_str());
        for (slot, name) in mat.textures() {
            if !name.is_empty() {
                println!("      {slot}: {}", name.as_str());
            }
        }
    }
    println!("Meshes: {}", model.meshes.len());
    for (i, mesh) in model.meshes.iter().enumerate() {
        println!(
            "  [{i}] {:?} lod {}: {} faces, {} vertices, {} indices, {} material refs",
            mesh.name.as_str(),
            mesh.lod_level,
            mesh.faces_count,
            mesh.vertex_size,
            mesh.indices_size,
            mesh.material_refs.len(),
        );
    }
    println!("Bones: {}", model.bones.len());
    println!("Entities: {}", model.entities.len());
    for entity in model.entities.iter() {
        println!("  {:?} at {:?}", entity.name.as_str(), entity.transform.position);
    }
    println!("Unknown points: {}", model.unknowns.len());
    println!("Collision points: {}", model.collision_points.len());
    if model.version()?.has_cleaves() {
        println!("Cleaves: {}", model.cleaves.len());
    }

    Ok(())
}
