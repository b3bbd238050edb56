mod test_densify;
mod test_distance;
