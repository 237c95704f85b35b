use std::io::{BufReader, BufWriter};

use bwm::axis::{flip_uv, xyz_to_zxy};
use bwm::builder::{ModelBuilder, SourceFace, SourceMesh};
use bwm::material::MaterialDefinition;
use bwm::summary::ModelType;
use bwm::vertex::Vertex;
use bwm::write::BwmWriterSettings;
use obj::raw::{RawObj, parse_obj};
use obj::{Obj, Position, TexturedVertex};

use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct FromObjArgs {
    /// Diffuse texture name for the model's material
    #[arg(short, long, default_value = "")]
    diffuse: String,
    /// Material type string
    #[arg(long, default_value = "")]
    material_type: String,
    /// Keep OBJ coordinates and texture V as-is
    #[arg(long)]
    no_axis_conversion: bool,
    #[command(flatten)]
    warg: crate::WriteArgs,
    #[command(flatten)]
    oarg: crate::OutputArgs,
    #[command(flatten)]
    outpath: crate::OutputPath,
    #[command(flatten)]
    inpaths: crate::InputPaths,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &FromObjArgs,
) -> AnyResult<()> {
    if args_cmd.inpaths.in_files.is_empty() {
        bail!("No input files provided.");
    }
    if args_cmd.inpaths.in_files.len() > 4 {
        bail!("At most 4 LODs are supported.");
    }

    let mut builder = ModelBuilder::new(ModelType::Model);
    if let Some(version) = args_cmd.warg.version {
        builder = builder.with_version(version);
    }
    let material = builder.add_material(MaterialDefinition {
        diffuse_map: args_cmd.diffuse.as_str().into(),
        material_type: args_cmd.material_type.as_str().into(),
        ..Default::default()
    });

    for (lod, path) in args_cmd.inpaths.in_files.iter().enumerate() {
        let infile = std::fs::File::open(path)
            .context("Cannot open input OBJ file")?;
        let rawobj = parse_obj(BufReader::new(infile))
            .context("Cannot parse OBJ file")?;
        let (mut vertices, indices) = try_ptn(rawobj.clone())
            .or_else(|_| try_pn(rawobj.clone()))
            .or_else(|_| try_p(rawobj))
            .context("OBJ file is not in any valid vertex format")?;
        if !args_cmd.no_axis_conversion {
            for v in vertices.iter_mut() {
                v.position = xyz_to_zxy(v.position);
                v.normal = v.normal.map(xyz_to_zxy);
                v.uvs.iter_mut().for_each(|uv| *uv = flip_uv(*uv));
            }
        }
        let faces = indices
            .chunks_exact(3)
            .map(|c| SourceFace {
                vertices: [c[0], c[1], c[2]],
                material,
            })
            .collect();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if args_common.verbose {
            eprintln!(
                "LOD {}: {:?}, {} vertices, {} faces.",
                lod + 1,
                name,
                vertices.len(),
                indices.len() / 3
            );
        }
        let mut mesh = SourceMesh::new(&name, vertices, faces);
        mesh.lod_level = lod as u32 + 1;
        builder.add_mesh(mesh).context("Cannot use OBJ mesh")?;
    }

    let model = builder.build().context("Cannot assemble model")?;

    let outfile = crate::create_output(&args_cmd.outpath.out_file, args_cmd.oarg.overwrite)?;
    let mut bufout = BufWriter::new(outfile);
    bwm::write::write_to_with_settings(
        BwmWriterSettings::from(&args_cmd.warg),
        &model,
        &mut bufout,
    )
    .context("Cannot encode output file")?;

    Ok(())
}

fn try_ptn(rawobj: RawObj) -> AnyResult<(Vec<Vertex>, Vec<u32>)> {
    let obj: Obj<TexturedVertex, u32> = Obj::new(rawobj)?;
    let vertices = obj
        .vertices
        .iter()
        .map(|v| Vertex {
            position: v.position,
            normal: Some(v.normal),
            uvs: vec![[v.texture[0], v.texture[1]]],
        })
        .collect();
    Ok((vertices, obj.indices))
}

fn try_pn(rawobj: RawObj) -> AnyResult<(Vec<Vertex>, Vec<u32>)> {
    let obj: Obj<obj::Vertex, u32> = Obj::new(rawobj)?;
    let vertices = obj
        .vertices
        .iter()
        .map(|v| Vertex {
            position: v.position,
            normal: Some(v.normal),
            uvs: vec![],
        })
        .collect();
    Ok((vertices, obj.indices))
}

fn try_p(rawobj: RawObj) -> AnyResult<(Vec<Vertex>, Vec<u32>)> {
    let obj: Obj<Position, u32> = Obj::new(rawobj)?;
    let vertices = obj
        .vertices
        .iter()
        .map(|v| Vertex {
            position: v.position,
            normal: None,
            uvs: vec![],
        })
        .collect();
    Ok((vertices, obj.indices))
}
