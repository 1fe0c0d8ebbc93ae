//! End-to-end checks over tables of well-formed, accepted and malformed
//! combination strings.

use approx::assert_relative_eq;
use combo_core::loads::{factored, parser, Arguments, BindingMode, Combination, LoadValue, Signature};
use combo_core::ComboError;
use ndarray::ArrayD;

const GOOD_COMBOS: [&str; 12] = [
    "(1.4 * D)",
    "(1.2 * D & 1.6 * L & 0.5 * (Lr | S | R))",
    "(1.2 * D & 1.6 * (S | Lr | R) & (1.0 * L | 0.5 * W))",
    "(1.2 * D & W & L & 0.5 * (Lr | S | R))",
    "(0.9 * D & W)",
    "(D)",
    "(D & L)",
    "(D & (S | Lr | R))",
    "(D & 0.75 * L & 0.75 * (Lr | S | R))",
    "(D & 0.6 * W)",
    "(D & 0.75 * L & 0.75 * 0.6 * W & 0.75 * (Lr | S | R))",
    "(0.6 * D & 0.6 * W)",
];

/// Syntactically valid, with every operand well formed
const OK_COMBOS: [&str; 2] = [
    "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W) & 1.1*1.3*1.4*X",
    "1.2*D & 1.6*(Lr | S | R) & 0.5*(L | 0.5*W) & 1.1*1.3*1.4*X",
];

const BAD_COMBOS: [&str; 10] = [
    // plus is not an operator
    "1.2*D + 1.6*(Lr | S | R) + (L | 0.5*W)",
    "1.2 * D & 1.6 * X * (S | Lr | R) & (1.0 * L | 0.5 * W)",
    "1.2 * D & X * (S | Lr | R) & (1.0 * L | 0.5 * W)",
    // missing parentheses
    "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W",
    "1.2*D & 1.6*(Lr | S | R) & L | 0.5*W)",
    "1.2*D & 1.6*(Lr | S | R & (L | 0.5*W)",
    "1.2*D & 1.6*Lr | S | R) & (L | 0.5*W)",
    // junk
    "1.2*D & 1.6*(Lr | S | R) & 1.1*(I(AM(A(LEAF(ON(THE(WIND) & 1.4*X & (L | 0.5*W)",
    // dangling and after an OR-group
    "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W) & 1.4*X",
    // parenthesized number inside a chain
    "1.2*D & 1.6*(Lr | S | R) & 1.1*(1.3)*1.4*X & (L | 0.5*W) ",
];

struct Loads {
    d: f64,
    l: f64,
    lr: f64,
    s: f64,
    r: f64,
    w: f64,
}

impl Loads {
    fn named(&self) -> [(&'static str, f64); 6] {
        [("D", self.d), ("L", self.l), ("Lr", self.lr), ("S", self.s), ("R", self.r), ("W", self.w)]
    }
}

const INPUTS: [Loads; 3] = [
    Loads { d: 1.0, l: 1.0, lr: 1.0, s: 1.0, r: 1.0, w: 1.0 },
    Loads { d: 1.0, l: 2.0, lr: 3.0, s: 4.0, r: 5.0, w: 6.0 },
    Loads { d: -6.0, l: -5.0, lr: -4.0, s: -3.0, r: -2.0, w: -1.0 },
];

fn max3(a: f64, b: f64, c: f64) -> f64 {
    a.max(b).max(c)
}

/// Governing value of each GOOD_COMBOS entry, by hand
fn expected_max(index: usize, x: &Loads) -> f64 {
    let Loads { d, l, lr, s, r, w } = *x;
    match index {
        0 => 1.4 * d,
        1 => 1.2 * d + 1.6 * l + 0.5 * max3(lr, s, r),
        2 => 1.2 * d + 1.6 * max3(s, lr, r) + (1.0 * l).max(0.5 * w),
        3 => 1.2 * d + w + l + 0.5 * max3(lr, s, r),
        4 => 0.9 * d + w,
        5 => d,
        6 => d + l,
        7 => d + max3(s, lr, r),
        8 => d + 0.75 * l + 0.75 * max3(lr, s, r),
        9 => d + 0.6 * w,
        10 => d + 0.75 * l + 0.75 * 0.6 * w + 0.75 * max3(lr, s, r),
        11 => 0.6 * d + 0.6 * w,
        _ => unreachable!(),
    }
}

fn max(result: &ArrayD<f64>) -> f64 {
    result.iter().cloned().fold(f64::MIN, f64::max)
}

#[test]
fn test_good_combinations_parse() {
    for expr in GOOD_COMBOS {
        let combo = Combination::parse(expr).unwrap_or_else(|e| panic!("{expr}: {e}"));
        assert!(combo.scenario_count().unwrap() >= 1, "{expr}");
        assert_eq!(combo.matrix().unwrap().ncols(), combo.identifiers().len(), "{expr}");
    }
}

#[test]
fn test_good_combinations_max_result() {
    for (index, expr) in GOOD_COMBOS.iter().enumerate() {
        let combo = Combination::parse(expr).unwrap();
        let params: Vec<String> = combo.identifiers().to_vec();
        let f = combo.function(Signature::new("combo", params.clone()).unwrap()).unwrap();

        for input in &INPUTS {
            // Only the parameters the function declares are passed
            let args = input
                .named()
                .into_iter()
                .filter(|(name, _)| params.iter().any(|p| p == name))
                .fold(Arguments::new(), |args, (name, value)| args.kwarg(name, value));

            let result = f.call(&args).unwrap();
            assert_relative_eq!(max(&result), expected_max(index, input), epsilon = 1e-12);
        }
    }
}

#[test]
fn test_ok_combinations_pass_identifier_extraction() {
    for expr in OK_COMBOS {
        let identifiers = parser::parse_identifiers(expr).unwrap();
        assert_eq!(identifiers, ["D", "Lr", "S", "R", "L", "W", "X"]);

        // Well-formed, but a bare term cannot follow an OR-group
        let err = Combination::parse(expr).unwrap_err();
        assert_eq!(err.error_code(), "EXPRESSION_ERROR", "{expr}");
    }
}

#[test]
fn test_bad_combinations_are_rejected() {
    for expr in BAD_COMBOS {
        match Combination::parse(expr) {
            Err(ComboError::Expression { expr: source, .. }) => assert_eq!(source, expr),
            Err(other) => panic!("{expr}: expected an expression error, got {other:?}"),
            Ok(combo) => panic!("{expr}: accepted as {combo}"),
        }
    }
}

#[test]
fn test_malformed_strings_are_expression_errors() {
    for expr in ["D + L", "(D & L", "D & L)", "D & L &", "D | L |", "D & (L | W", "D &&"] {
        let err = Combination::parse(expr).unwrap_err();
        assert_eq!(err.error_code(), "EXPRESSION_ERROR", "{expr}");
    }
}

#[test]
fn test_every_binding_mode_gives_the_same_result() {
    let signatures = [
        (BindingMode::Function, vec!["D", "L"]),
        (BindingMode::Method, vec!["first_param", "D", "L"]),
        (BindingMode::ClassMethod, vec!["first_param", "D", "L"]),
        (BindingMode::StaticMethod, vec!["D", "L"]),
    ];

    for (mode, params) in signatures {
        let combo = Combination::parse("1.4*D & 1.2*L").unwrap();
        let f = combo.bind(Signature::new("m", params).unwrap(), mode).unwrap();
        let result = f.call_positional([1.0, 1.0]).unwrap();
        assert_relative_eq!(max(&result), 2.6, epsilon = 1e-12);
    }
}

#[test]
fn test_parsed_matches_composed() {
    let parsed = Combination::parse("1.2*D & 1.6*(S|Lr|R)").unwrap();
    let composed: Combination = 1.2 * factored("D") & 1.6 * (factored("S") | factored("Lr") | factored("R"));

    assert_eq!(parsed.identifiers(), composed.identifiers());
    assert_eq!(parsed.matrix().unwrap(), composed.matrix().unwrap());
}

#[test]
fn test_matrix_shape_is_product_of_group_sizes() {
    let combo = Combination::parse("1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W)").unwrap();
    assert_eq!(combo.matrix().unwrap().dim(), (6, 6));
    for row in combo.matrix().unwrap().rows() {
        // D, one of Lr/S/R, one of L/W
        assert_eq!(row.iter().filter(|c| **c != 0.0).count(), 3);
    }
}

#[test]
fn test_array_loads_broadcast_with_scenarios_first() {
    let combo = Combination::parse("1.2*D & 1.6*L & 0.5*(Lr | S)").unwrap();
    let values = [
        LoadValue::from(vec![10.0, 20.0, 30.0, 40.0]),
        LoadValue::from(50.0),
        LoadValue::from(0.0),
        LoadValue::from(vec![5.0, 5.0, 5.0, 5.0]),
    ];
    let result = combo.evaluate_ordered(&values).unwrap();
    assert_eq!(result.shape(), &[2, 4]);
    assert_relative_eq!(result[[0, 3]], 1.2 * 40.0 + 1.6 * 50.0, epsilon = 1e-12);
    assert_relative_eq!(result[[1, 0]], 1.2 * 10.0 + 1.6 * 50.0 + 0.5 * 5.0, epsilon = 1e-12);
}
