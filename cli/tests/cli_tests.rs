#[test]
fn cmd() {
    trycmd::TestCases::new()
        .case("tests/cmd/*.toml")
        .default_bin_name("npio");
}
