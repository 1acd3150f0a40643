pub mod trimesh_engine;
