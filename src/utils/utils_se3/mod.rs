pub mod scene_graph;
