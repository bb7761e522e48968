pub mod model_loader;
