/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Command-line interface
//!
//! The `dataset` subcommand drives PAW dataset generation; `symmetry`
//! analyzes a simple structure file.

use crate::paw::{generate, parse_projectors, GenerateConfig, GeneratorError, PseudizeKind};
use crate::symmetry::Symmetry;
use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use ndarray::Array2;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gpaw-rs", version, about = "PAW dataset generation and crystal symmetry tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a PAW dataset
    Dataset(DatasetArgs),
    /// Analyse the symmetry of a structure file
    Symmetry(SymmetryArgs),
}

#[derive(Args)]
pub struct DatasetArgs {
    /// Chemical symbol
    pub symbol: String,

    /// Exchange-correlation functional
    #[arg(short = 'f', long = "xc-functional", default_value = "LDA", value_name = "XC")]
    pub xc_functional: String,

    /// Projector functions: comma-separated nl values, where n can be a
    /// principal quantum number (integer) or an energy (float).
    /// Example: 2s,0.5s,2p,0.5p,0.0d
    #[arg(short = 'P', long)]
    pub projectors: Option<String>,

    /// Cutoff radius or radii, e.g. "1.2" or "1.2,1.1,1.1"
    #[arg(short = 'r', long)]
    pub radius: Option<String>,

    /// Parameters for the zero potential: nderivs,radius
    #[arg(short = '0', long = "zero-potential", value_name = "nderivs,radius")]
    pub zero_potential: Option<String>,

    /// Radius for pseudizing the core density (negative selects NLCC)
    #[arg(short = 'c', long = "pseudo-core-density-radius", value_name = "radius")]
    pub pseudo_core_density_radius: Option<f64>,

    /// Parameters for pseudizing the wave functions: type,nderivs
    #[arg(short = 'z', long, value_name = "type,nderivs")]
    pub pseudize: Option<String>,

    /// Plot logarithmic derivatives, e.g. spdf,-1:1:0.05,1.3
    #[arg(short = 'l', long = "logarithmic-derivatives", value_name = "spdfg,e1:e2:de,radius")]
    pub logarithmic_derivatives: Option<String>,

    /// Write the dataset file
    #[arg(short = 'w', long)]
    pub write: bool,

    /// Use the scalar-relativistic atom
    #[arg(short = 's', long)]
    pub scalar_relativistic: bool,

    /// Skip the eigenvalue validation
    #[arg(short = 'n', long)]
    pub no_check: bool,

    /// Dataset tag
    #[arg(short = 't', long)]
    pub tag: Option<String>,

    /// Shape-function width parameter
    #[arg(short = 'a', long)]
    pub alpha: Option<f64>,

    /// Yukawa separation parameter for screened exchange
    #[arg(short = 'g', long, default_value_t = 0.0)]
    pub gamma: f64,

    /// Use an NLCC-style pseudo core density
    #[arg(long)]
    pub nlcc: bool,

    /// Core hole, e.g. 1s,0.5
    #[arg(long)]
    pub core_hole: Option<String>,

    /// Number of valence electrons of the dataset variant
    #[arg(short = 'e', long)]
    pub electrons: Option<usize>,

    /// Output directory for written files
    #[arg(short = 'o', long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct SymmetryArgs {
    /// Structure file: three cell-vector lines (Bohr) followed by
    /// "Symbol x y z" lines with scaled positions
    pub filename: PathBuf,

    /// Allow fractional translations
    #[arg(long)]
    pub fractional: bool,
}

/// Run the dataset subcommand.
pub fn run_dataset(args: &DatasetArgs) -> anyhow::Result<()> {
    let mut config = GenerateConfig::from_table(
        &args.symbol,
        &args.xc_functional,
        args.electrons,
    )?;

    if let Some(projectors) = &args.projectors {
        parse_projectors(projectors)?;
        config.projectors = projectors.clone();
    }
    if let Some(radius) = &args.radius {
        config.radii = radius
            .split(',')
            .map(|r| r.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .context("bad --radius")?;
    }
    if let Some(zero_potential) = &args.zero_potential {
        let (nderivs, radius) = zero_potential
            .split_once(',')
            .ok_or_else(|| anyhow!("--zero-potential needs nderivs,radius"))?;
        config.nderiv0 = nderivs.trim().parse().context("bad nderivs")?;
        config.r0 = radius.trim().parse().context("bad radius")?;
    }
    if let Some(pseudize) = &args.pseudize {
        let (kind, nderivs) = pseudize
            .split_once(',')
            .ok_or_else(|| anyhow!("--pseudize needs type,nderivs"))?;
        config.pseudize = (
            match kind.trim() {
                "poly" => PseudizeKind::Poly,
                "nc" => PseudizeKind::NormConserving,
                other => bail!("unknown pseudization type '{}'", other),
            },
            nderivs.trim().parse().context("bad nderivs")?,
        );
    }
    config.alpha = args.alpha;
    config.scalar_relativistic = args.scalar_relativistic;
    config.core_hole = args.core_hole.clone();
    config.yukawa_gamma = args.gamma;
    if let Some(rcore) = args.pseudo_core_density_radius {
        config.rcore = Some(if args.nlcc { -rcore } else { rcore });
    }

    let mut generator = generate(&config)?;

    if !args.no_check && !generator.check_all()? {
        return Err(GeneratorError::DatasetGeneration(format!(
            "eigenvalue check failed for {}",
            args.symbol
        ))
        .into());
    }

    if let Some(spec) = &args.logarithmic_derivatives {
        print_logarithmic_derivatives(&generator, spec)?;
    }

    if args.write {
        let setup = generator.make_paw_setup(args.tag.as_deref())?;
        let path = args.output.join(format!("{}.xml", setup.filename()));
        setup.write_xml(&path)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn print_logarithmic_derivatives(
    generator: &crate::paw::PAWSetupGenerator,
    spec: &str,
) -> anyhow::Result<()> {
    // Format: letters[,e1:e2:de[,radius]]
    let mut parts = spec.split(',');
    let letters = parts.next().unwrap_or("spd");
    let erange = parts.next();
    let radius = parts.next();

    let (emin, emax, de) = match erange {
        Some(text) => {
            let values: Vec<f64> = text
                .split(':')
                .map(|x| x.parse::<f64>())
                .collect::<std::result::Result<_, _>>()
                .context("bad energy range")?;
            match values.as_slice() {
                [a, b, d] => (*a, *b, *d),
                _ => bail!("energy range must be e1:e2:de"),
            }
        }
        None => (-1.0, 1.0, 0.05),
    };
    let rcut = match radius {
        Some(r) => r.parse().context("bad radius")?,
        None => 1.1 * generator.rcmax,
    };

    let nsteps = ((emax - emin) / de) as usize + 1;
    let energies: Vec<f64> = (0..nsteps).map(|i| emin + i as f64 * de).collect();

    for letter in letters.chars() {
        let l = "spdfg"
            .find(letter)
            .ok_or_else(|| anyhow!("bad channel letter '{}'", letter))?;
        let ae = generator.aea.logarithmic_derivative(l, &energies, rcut)?;
        let ps = generator.logarithmic_derivative(l, &energies, rcut)?;
        // The all-electron curve is offset by an integer per core node;
        // align before measuring the error
        let shift = (ae[0] - ps[0]).round();
        let error: f64 = ae
            .iter()
            .zip(&ps)
            .map(|(a, p)| (a - shift - p).abs())
            .sum::<f64>()
            * de;
        println!("Logarithmic derivative error: {} {:.6}", l, error);
    }
    Ok(())
}

/// Run the symmetry subcommand.
pub fn run_symmetry(args: &SymmetryArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.filename)
        .with_context(|| format!("reading {}", args.filename.display()))?;
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let mut cell_cv = Array2::zeros((3, 3));
    for c in 0..3 {
        let line = lines.next().ok_or_else(|| anyhow!("missing cell vector"))?;
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|x| x.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .context("bad cell vector")?;
        if values.len() != 3 {
            bail!("cell vector needs three components");
        }
        for v in 0..3 {
            cell_cv[(c, v)] = values[v];
        }
    }

    let mut id_a = Vec::new();
    let mut spos_ac = Vec::new();
    for line in lines {
        let mut fields = line.split_whitespace();
        let symbol = fields.next().ok_or_else(|| anyhow!("missing symbol"))?;
        let z = crate::atom::atomic_number(symbol)?;
        let mut spos = [0.0; 3];
        for s in spos.iter_mut() {
            *s = fields
                .next()
                .ok_or_else(|| anyhow!("missing coordinate"))?
                .parse()
                .context("bad coordinate")?;
        }
        id_a.push(z);
        spos_ac.push(spos);
    }

    let mut symmetry = Symmetry::new(id_a, cell_cv, [true; 3]);
    if args.fractional {
        symmetry = symmetry.with_fractional_translations();
    }
    symmetry.analyze(&spos_ac);

    println!("Symmetries present (total): {}", symmetry.op_scc.len());
    for (op_cc, ft_c) in symmetry.op_scc.iter().zip(&symmetry.ft_sc) {
        for c in 0..3 {
            print!(
                "  ({:2} {:2} {:2})",
                op_cc[(c, 0)],
                op_cc[(c, 1)],
                op_cc[(c, 2)]
            );
            if ft_c[c] != 0.0 {
                print!(" + ({:.3})", ft_c[c]);
            }
            println!();
        }
        println!();
    }
    Ok(())
}
