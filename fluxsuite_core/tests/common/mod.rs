#![allow(dead_code)]
use std::sync::Arc;

use fluxsuite_core::flux_analysis::dispatcher::Dispatcher;
use fluxsuite_core::metabolic_model::metabolite::Metabolite;
use fluxsuite_core::metabolic_model::model::Model;
use fluxsuite_core::metabolic_model::reaction::ReactionBuilder;
use fluxsuite_core::optimize::solvers::microlp::MicrolpSolver;

pub fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(MicrolpSolver::new()))
}

fn add_reaction(
    model: &mut Model,
    id: &str,
    metabolites: &[(&str, f64)],
    bounds: (f64, f64),
    rule: &str,
) {
    let mut builder = ReactionBuilder::default();
    builder
        .id(id)
        .lower_bound(bounds.0)
        .upper_bound(bounds.1)
        .gene_reaction_rule(rule);
    for (metabolite, coefficient) in metabolites {
        builder.metabolite(metabolite, *coefficient);
    }
    model.add_reaction(builder.build().unwrap());
}

/// `-> A -> B ->`: uptake, the A -> B step capped at 10 and catalyzed by `g1 and g2`, biomass
pub fn chain() -> Model {
    let mut model = Model::new_empty();
    model.add_metabolite(Metabolite::new("A", Some("c")));
    model.add_metabolite(Metabolite::new("B", Some("c")));
    add_reaction(&mut model, "UPTAKE", &[("A", 1.)], (0., 1000.), "");
    add_reaction(&mut model, "A_TO_B", &[("A", -1.), ("B", 1.)], (0., 10.), "g1 and g2");
    add_reaction(&mut model, "BIOMASS", &[("B", -1.)], (0., 1000.), "");
    model
}

/// Glucose is either respired (3 biomass precursors per glucose, needs oxygen) or fermented
/// to acetate (`ack`) or lactate (`ldh`), 1 precursor per glucose
pub fn respiration() -> Model {
    let mut model = Model::new_empty();
    for (id, compartment) in [
        ("glc_e", "e"),
        ("o2_e", "e"),
        ("ac_e", "e"),
        ("lac_e", "e"),
        ("glc_c", "c"),
        ("x_c", "c"),
    ] {
        model.add_metabolite(Metabolite::new(id, Some(compartment)));
    }
    add_reaction(&mut model, "EX_glc_e", &[("glc_e", -1.)], (-10., 1000.), "");
    add_reaction(&mut model, "EX_o2_e", &[("o2_e", -1.)], (-20., 1000.), "");
    add_reaction(&mut model, "EX_ac_e", &[("ac_e", -1.)], (0., 1000.), "");
    add_reaction(&mut model, "EX_lac_e", &[("lac_e", -1.)], (0., 1000.), "");
    add_reaction(
        &mut model,
        "GLCt",
        &[("glc_e", -1.), ("glc_c", 1.)],
        (0., 1000.),
        "ptsG",
    );
    add_reaction(
        &mut model,
        "RESP",
        &[("glc_c", -1.), ("o2_e", -1.), ("x_c", 3.)],
        (0., 1000.),
        "cyoA and cyoB",
    );
    add_reaction(
        &mut model,
        "ACK",
        &[("glc_c", -1.), ("x_c", 1.), ("ac_e", 1.)],
        (0., 1000.),
        "ack",
    );
    add_reaction(
        &mut model,
        "LDH",
        &[("glc_c", -1.), ("x_c", 1.), ("lac_e", 1.)],
        (0., 1000.),
        "ldh",
    );
    let mut biomass = ReactionBuilder::default();
    biomass
        .id("BIOMASS")
        .name("Biomass production")
        .metabolite("x_c", -1.)
        .lower_bound(0.)
        .upper_bound(1000.);
    model.add_reaction(biomass.build().unwrap());
    model
}

/// Reversible exchange of A into a reversible loop `A <-> C`, `C <-> A'` and a sink
pub fn reversible() -> Model {
    let mut model = Model::new_empty();
    for id in ["A", "C"] {
        model.add_metabolite(Metabolite::new(id, Some("c")));
    }
    add_reaction(&mut model, "EX_A", &[("A", -1.)], (-5., 5.), "");
    add_reaction(&mut model, "A_C", &[("A", -1.), ("C", 1.)], (-100., 100.), "");
    add_reaction(&mut model, "C_A", &[("C", -1.), ("A", 1.)], (-100., 100.), "");
    let mut sink = ReactionBuilder::default();
    sink.id("biomass_sink")
        .metabolite("C", -1.)
        .lower_bound(0.)
        .upper_bound(1000.);
    model.add_reaction(sink.build().unwrap());
    model
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {} within {} of {}",
        actual,
        tolerance,
        expected
    );
}
