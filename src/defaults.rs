//! Default configuration: an Earth-like twin observed from 3 to 20 μm.

use retrieval_types::{PriorKind, SectionId};
use tracing::info;

use crate::document::{
    CloudParameters, ConfigurationDocument, GroundTruthData, ParameterSection, RunSettings,
    ScatteringFlags, UserUnits,
};
use crate::error::Result;
use crate::prior::ParameterSpec;
use crate::species::{ChemicalComposition, ChemistrySettings, SpeciesEntry};

const INPUT_ROOT: &str = "/net/ipa-gate/export/ipa/quanz/user_accounts/konradb/Retrieval_Inputs/Timmy";

/// Temperature polynomial coefficients: name, uniform bounds, truth.
const TEMPERATURE_PRIORS: &[(&str, [f64; 2], f64)] = &[
    ("a_4", [2.0, 5.0], 3.67756393),
    ("a_3", [0.0, 100.0], 136.42147966),
    ("a_2", [0.0, 300.0], 182.6557084),
    ("a_1", [0.0, 100.0], 136.42147966),
    ("a_0", [0.0, 600.0], 292.92802205),
];

/// Species: formula, log-uniform bounds, truth abundance, line tags.
const SPECIES_PRIORS: &[(&str, [f64; 2], f64, &[&str])] = &[
    ("N2", [-2.0, 0.0], 0.78, &[]),
    ("O2", [-2.0, 0.0], 0.20, &["O2_main_HN16_HH_Chubb", "O2_UV"]),
    ("CO2", [-15.0, 0.0], 0.004, &["CO2_main_HN20_air_C25", "CO2_UV"]),
    ("CH4", [-15.0, 0.0], 0.0000017, &["CH4_main_HN20_air_C25", "CH4_UV"]),
    ("H2O", [-15.0, 0.0], 0.001, &["H2O_main_HN20_air_C25", "H2O_UV"]),
    ("O3", [-15.0, 0.0], 0.0000003, &["O3_main_HN20_air_C25", "O3_UV"]),
    ("CO", [-15.0, 0.0], 0.000000125, &["CO_main_HN20_air_C25", "CO_UV"]),
    ("N2O", [-15.0, 0.0], 0.00000032, &["N2O_main_HN20_air_C25", "N2O_UV"]),
];

/// Fixed scattering inputs: name, value.
const SCATTERING_VALUES: &[(&str, f64)] = &[
    ("reflectance", 0.1),
    ("emissivity", 1.0),
    ("stellar_temperature", 5778.0),
    ("stellar_radius", 1.0),
    ("semimajor_axis", 1.0),
];

/// Build the default document. Every call yields an identical document.
pub fn build_default() -> Result<ConfigurationDocument> {
    let mut doc = ConfigurationDocument::empty();

    doc.set_ground_truth(&GroundTruthData {
        input_profile: Some(format!("{}/PT_Timmy_2.txt", INPUT_ROOT)),
        data_files: vec![format!("{}/Earth_Timmy_R200_ph_SN_10_2.txt", INPUT_ROOT)],
    })?;

    doc.set_run_settings(&RunSettings {
        wavelength_range: [3.0, 20.0],
        output_folder: ".".to_string(),
        live_points: 600,
        include_scattering: ScatteringFlags {
            rayleigh: true,
            thermal: true,
            direct_light: true,
            clouds: false,
        },
        include_cia: true,
        include_moon: false,
        parameterization: "polynomial".to_string(),
        vae_net: Some("decoder.onx".to_string()),
        top_log_pressure: -6.0,
        n_layers: 100,
    })?;

    let mut temperature = ParameterSection::new();
    for (name, bounds, truth) in TEMPERATURE_PRIORS {
        temperature.insert(
            *name,
            ParameterSpec::distribution(PriorKind::Uniform, *bounds, Some(*truth))?,
        );
    }
    doc.set_parameters(SectionId::TemperatureParameters, &temperature)?;

    let physical = ParameterSection::new()
        .with(
            "P0",
            ParameterSpec::distribution(PriorKind::LogUniform, [-2.0, 2.0], Some(1.0294))?,
        )
        .with("d_syst", ParameterSpec::known(10.0))
        .with(
            "R_pl",
            ParameterSpec::distribution(PriorKind::Gaussian, [1.0, 0.2], Some(1.0))?
                .with_unit("Rearth"),
        )
        .with(
            "M_pl",
            ParameterSpec::distribution(PriorKind::LogGaussian, [0.0, 0.4], Some(1.0))?,
        );
    doc.set_parameters(SectionId::PhysicalParameters, &physical)?;

    let mut chemistry = ChemicalComposition::new(ChemistrySettings {
        resolution: 200,
        mmw_inert: 28.0,
    });
    for (formula, bounds, truth, lines) in SPECIES_PRIORS {
        let mut abundance =
            ParameterSpec::distribution(PriorKind::LogUniform, *bounds, Some(*truth))?;
        if !lines.is_empty() {
            abundance = abundance.with_lines(lines.iter().map(|t| t.to_string()).collect());
        }
        chemistry.upsert(SpeciesEntry::new(*formula, abundance)?);
    }
    doc.set_chemistry(&chemistry)?;

    let mut scattering = ParameterSection::new();
    for (name, value) in SCATTERING_VALUES {
        scattering.insert(*name, ParameterSpec::known(*value));
    }
    doc.set_parameters(SectionId::ScatteringParameters, &scattering)?;

    doc.set_clouds(&CloudParameters {
        composition: "transparent".to_string(),
    })?;

    let mut units = UserUnits::default();
    units.insert("R_sun", "1m");
    doc.set_user_units(&units)?;

    doc.validate()?;
    info!("Built default configuration");
    Ok(doc)
}
