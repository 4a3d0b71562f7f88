// Tests for forward propagation through the layer chain: output shapes,
// known values and the precondition errors.

use approx::assert_relative_eq;
use multilayer_perceptron::utils::activations::{
    sigmoid, Activation, Identity, Relu, Sigmoid, Softmax, Tanh,
};
use multilayer_perceptron::utils::costs::{CrossEntropy, MeanSquaredError};
use multilayer_perceptron::{Layer, LayerNode, Matrix, Network, NetworkError, SimpleRng};

fn xor_network() -> Network {
    Network::new(2)
        .unwrap()
        .add_dense(4, Box::new(Tanh), 0.0)
        .unwrap()
        .with_output(1, Box::new(Sigmoid), Box::new(MeanSquaredError))
        .unwrap()
}

fn set_parameters(network: &mut Network, index: usize, weights: Matrix, bias: Vec<f64>) {
    let dense = network.dense_mut(index).unwrap();
    dense.set_weights(weights).unwrap();
    dense.set_bias(bias).unwrap();
}

// ============================================================================
// Output shapes
// ============================================================================

#[test]
fn test_prediction_shape_follows_batch() {
    let mut rng = SimpleRng::new(42);
    let mut network = xor_network();
    network.initialize(&mut rng).unwrap();

    for batch in [1, 4, 17] {
        let prediction = network.forward(&Matrix::zeros(batch, 2), &mut rng).unwrap();
        assert_eq!(prediction.shape(), (batch, 1));
    }
}

#[test]
fn test_every_layer_output_has_its_width() {
    let mut rng = SimpleRng::new(5);
    let mut network = Network::new(3)
        .unwrap()
        .add_dense(6, Box::new(Relu), 0.0)
        .unwrap()
        .add_dense(5, Box::new(Tanh), 0.0)
        .unwrap()
        .with_output(4, Box::new(Softmax), Box::new(CrossEntropy))
        .unwrap();
    network.initialize(&mut rng).unwrap();
    network.forward(&Matrix::zeros(8, 3), &mut rng).unwrap();

    for layer in network.layers() {
        assert_eq!(layer.output().unwrap().shape(), (8, layer.size()));
    }
}

#[test]
fn test_softmax_rows_sum_to_one() {
    let mut rng = SimpleRng::new(9);
    let mut network = Network::new(3)
        .unwrap()
        .with_output(5, Box::new(Softmax), Box::new(CrossEntropy))
        .unwrap();
    network.initialize(&mut rng).unwrap();

    let x = Matrix::random_uniform(6, 3, -2.0, 2.0, &mut rng);
    let prediction = network.forward(&x, &mut rng).unwrap();
    for row in 0..prediction.rows() {
        let sum: f64 = prediction.row(row).unwrap().iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
    }
}

// ============================================================================
// Known values
// ============================================================================

#[test]
fn test_forward_known_values() {
    let mut rng = SimpleRng::new(1);
    let mut network = Network::new(2)
        .unwrap()
        .add_dense(2, Box::new(Identity), 0.0)
        .unwrap()
        .with_output(1, Box::new(Sigmoid), Box::new(MeanSquaredError))
        .unwrap();
    network.initialize(&mut rng).unwrap();
    set_parameters(
        &mut network,
        1,
        Matrix::from_vec(2, 2, vec![1.0, -1.0, 0.5, 2.0]).unwrap(),
        vec![0.1, 0.0],
    );
    set_parameters(
        &mut network,
        2,
        Matrix::from_vec(2, 1, vec![1.0, 1.0]).unwrap(),
        vec![-0.5],
    );

    let x = Matrix::from_vec(1, 2, vec![2.0, 1.0]).unwrap();
    let prediction = network.forward(&x, &mut rng).unwrap().clone();

    // hidden = [2 + 0.5 + 0.1, -2 + 2] = [2.6, 0.0]
    let hidden = network.layer(1).unwrap().output().unwrap();
    assert_relative_eq!(hidden.as_slice()[0], 2.6, epsilon = 1e-12);
    assert_relative_eq!(hidden.as_slice()[1], 0.0, epsilon = 1e-12);
    assert_relative_eq!(prediction.as_slice()[0], sigmoid(2.1), epsilon = 1e-12);
}

#[test]
fn test_output_is_activation_of_pre_activation_without_dropout() {
    let mut rng = SimpleRng::new(11);
    let mut network = xor_network();
    network.initialize(&mut rng).unwrap();
    network
        .forward(&Matrix::random_uniform(5, 2, 0.0, 1.0, &mut rng), &mut rng)
        .unwrap();

    for layer in &network.layers()[1..] {
        let dense = layer.dense().unwrap();
        let expected = dense.activation().apply(dense.pre_activation().unwrap());
        assert_eq!(layer.output().unwrap(), &expected);
        assert!(dense.drop_mask().is_none());
    }
}

#[test]
fn test_input_layer_stores_batch_verbatim() {
    let mut rng = SimpleRng::new(2);
    let mut network = xor_network();
    network.initialize(&mut rng).unwrap();
    let x = Matrix::from_vec(2, 2, vec![0.25, 0.5, 0.75, 1.0]).unwrap();
    network.forward(&x, &mut rng).unwrap();

    match network.layer(0).unwrap() {
        LayerNode::Input(input) => assert_eq!(input.output().unwrap(), &x),
        other => panic!("expected input layer, found {}", other.kind()),
    }
}

#[test]
fn test_non_finite_weight_propagates_through_zero_input() {
    let mut rng = SimpleRng::new(1);
    let mut network = Network::new(2)
        .unwrap()
        .with_output(1, Box::new(Identity), Box::new(MeanSquaredError))
        .unwrap();
    set_parameters(
        &mut network,
        1,
        Matrix::from_vec(2, 1, vec![f64::INFINITY, 1.0]).unwrap(),
        vec![0.0],
    );

    // 0 * inf is NaN, never a silent 0
    let x = Matrix::from_vec(2, 2, vec![0.0, 3.0, 1.0, 3.0]).unwrap();
    let prediction = network.forward(&x, &mut rng).unwrap();
    assert!(prediction.as_slice()[0].is_nan());
    assert_eq!(prediction.as_slice()[1], f64::INFINITY);
}

#[test]
fn test_same_seed_same_prediction() {
    let x = Matrix::from_vec(4, 2, vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]).unwrap();
    let run = || {
        let mut rng = SimpleRng::new(123);
        let mut network = xor_network();
        network.initialize(&mut rng).unwrap();
        let prediction = network.forward(&x, &mut rng).unwrap().clone();
        prediction
    };
    assert_eq!(run(), run());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_wrong_feature_count() {
    let mut rng = SimpleRng::new(3);
    let mut network = xor_network();
    network.initialize(&mut rng).unwrap();
    let err = network.forward(&Matrix::zeros(4, 3), &mut rng).unwrap_err();
    assert!(matches!(err, NetworkError::ShapeMismatch { .. }));
}

#[test]
fn test_forward_before_initialize() {
    let mut rng = SimpleRng::new(3);
    let mut network = xor_network();
    let err = network.forward(&Matrix::zeros(4, 2), &mut rng).unwrap_err();
    assert!(matches!(err, NetworkError::Uninitialized { layer: 1 }));
}

#[test]
fn test_loss_before_forward() {
    let mut rng = SimpleRng::new(3);
    let mut network = xor_network();
    network.initialize(&mut rng).unwrap();
    let err = network.calculate_loss(&Matrix::zeros(4, 1)).unwrap_err();
    assert!(matches!(err, NetworkError::OrderingViolation(_)));
}
