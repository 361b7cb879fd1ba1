use super::*;

fn compile(format: &Format) -> Vec<CompiledFlag> {
    format.compile(&CompileContext::default()).unwrap()
}

fn find<'a>(flags: &'a [CompiledFlag], name: &str) -> Option<&'a CompiledFlag> {
    flags.iter().find(|f| f.flag == name)
}

#[test]
fn empty_format_compiles_to_empty_flag_list() {
    assert!(compile(&Format::output()).is_empty());
    assert!(compile(&Format::input()).is_empty());
}

#[test]
fn compile_is_idempotent() {
    let mut format = Format::output();
    format.set_video_codec("libx264").unwrap();
    format.set_audio_bitrate(128).unwrap();
    format.add_video_filter("scale=640:480").unwrap();

    let first = compile(&format);
    let second = compile(&format);
    assert_eq!(first, second);
}

#[test]
fn options_emit_in_stable_declaration_order() {
    let mut format = Format::output();
    // Set in reverse of declaration order; compile order must not care.
    format.set_audio_codec("aac").unwrap();
    format.set_video_codec("libx264").unwrap();
    format.set_format("mp4").unwrap();

    let compiled = compile(&format);
    let flags: Vec<&str> = compiled.iter().map(|f| f.flag.as_str()).collect::<Vec<_>>();
    assert_eq!(flags, vec!["-f", "-vcodec", "-acodec"]);
}

#[test]
fn scalar_options_substitute_the_setting_placeholder() {
    let mut format = Format::output();
    format.set_video_bitrate(2500).unwrap();
    format.set_sample_rate(44100).unwrap();

    let flags = compile(&format);
    assert_eq!(find(&flags, "-b:v").unwrap().value.as_deref(), Some("2500k"));
    assert_eq!(find(&flags, "-ar").unwrap().value.as_deref(), Some("44100"));
}

#[test]
fn additional_command_overrides_mapped_flag() {
    let mut format = Format::output();
    format.set_video_codec("libx264").unwrap();
    format.add_command("-vcodec", Some("libx265"));

    let flags = compile(&format);
    let occurrences: Vec<_> = flags.iter().filter(|f| f.flag == "-vcodec").collect();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].value.as_deref(), Some("libx265"));
}

#[test]
fn removed_command_suppresses_mapped_flag() {
    let mut format = Format::output();
    format.set_video_codec("libx264").unwrap();
    format.set_audio_codec("aac").unwrap();
    format.remove_command("-vcodec");

    let flags = compile(&format);
    assert!(find(&flags, "-vcodec").is_none());
    assert!(find(&flags, "-acodec").is_some());
}

#[test]
fn video_filters_accumulate_into_one_comma_joined_flag() {
    for n in 1..=4usize {
        let mut format = Format::output();
        let mut expected = Vec::new();
        for i in 0..n {
            let filter = format!("setpts=PTS+{i}");
            format.add_video_filter(&filter).unwrap();
            expected.push(filter);
        }

        let flags = compile(&format);
        let occurrences: Vec<_> = flags.iter().filter(|f| f.flag == "-vf").collect();
        assert_eq!(occurrences.len(), 1, "exactly one -vf for n={n}");
        assert_eq!(occurrences[0].value.as_deref(), Some(expected.join(",").as_str()));
    }
}

#[test]
fn audio_filters_accumulate_independently_of_video_filters() {
    let mut format = Format::output();
    format.add_video_filter("scale=1280:720").unwrap();
    format.add_audio_filter("volume=0.8").unwrap();
    format.add_audio_filter("atempo=1.5").unwrap();

    let flags = compile(&format);
    assert_eq!(find(&flags, "-vf").unwrap().value.as_deref(), Some("scale=1280:720"));
    assert_eq!(
        find(&flags, "-af").unwrap().value.as_deref(),
        Some("volume=0.8,atempo=1.5")
    );
}

#[test]
fn padding_joins_the_video_filter_group() {
    let mut format = Format::output();
    format.add_video_filter("scale=1280:720").unwrap();
    format.set_padding(1280, 800, 0, 40).unwrap();

    let flags = compile(&format);
    let vf = find(&flags, "-vf").unwrap();
    // Padding is declared before the free-form filters, so it leads.
    assert_eq!(vf.value.as_deref(), Some("pad=1280:800:0:40,scale=1280:720"));
}

#[test]
fn frame_rate_flag_differs_per_direction() {
    let mut out = Format::output();
    out.set_frame_rate(23.976).unwrap();
    assert!(find(&compile(&out), "-r").is_some());

    let mut inp = Format::input();
    inp.set_frame_rate(25.0).unwrap();
    let flags = compile(&inp);
    assert_eq!(find(&flags, "-framerate").unwrap().value.as_deref(), Some("25"));
    assert!(find(&flags, "-r").is_none());
}

#[test]
fn direction_restricted_settings_reject_input_formats() {
    let mut format = Format::input();
    assert!(format.set_video_bitrate(1000).is_err());
    assert!(format.set_audio_bitrate(128).is_err());
    assert!(format.set_threads(4).is_err());
    assert!(format.set_quality(5).is_err());
}

#[test]
fn codec_aliases_resolve_without_registry() {
    let mut format = Format::output();
    format.set_video_codec("h264").unwrap();
    format.set_audio_codec("mp3").unwrap();

    let flags = compile(&format);
    assert_eq!(find(&flags, "-vcodec").unwrap().value.as_deref(), Some("libx264"));
    assert_eq!(find(&flags, "-acodec").unwrap().value.as_deref(), Some("libmp3lame"));
}

#[test]
fn codec_aliases_fall_back_through_the_registry() {
    let mut registry = CodecRegistry::new();
    registry.add_video("h264"); // engine build lacking libx264

    let mut format = Format::output().with_registry(registry);
    format.set_video_codec("h264").unwrap();
    let flags = compile(&format);
    assert_eq!(find(&flags, "-vcodec").unwrap().value.as_deref(), Some("h264"));
}

#[test]
fn codec_alias_with_no_available_candidate_is_an_error() {
    let registry = CodecRegistry::new();
    let mut format = Format::output().with_registry(registry);
    assert!(format.set_video_codec("av1").is_err());
}

#[test]
fn unknown_names_are_rejected_at_setter_time() {
    let mut format = Format::output();
    assert!(format.set_video_codec("not_a_codec").is_err());
    assert!(format.set_pixel_format("yuv421x").is_err());
    assert!(format.set_format("not_a_container").is_err());
    assert!(format.set_sample_rate(44000).is_err());
    assert!(format.set_aspect_ratio("wide").is_err());
}

#[test]
fn numeric_ranges_are_enforced() {
    let mut format = Format::output();
    assert!(format.set_quality(0).is_err());
    assert!(format.set_quality(32).is_err());
    assert!(format.set_quality(31).is_ok());
    assert!(format.set_threads(0).is_err());
    assert!(format.set_threads(65).is_err());
    assert!(format.set_threads(64).is_ok());
    assert!(format.set_audio_channels(9).is_err());
}

#[test]
fn match_source_dimensions_resolve_from_context() {
    let mut format = Format::output();
    format.set_dimensions_match_source();

    let ctx = CompileContext {
        width: Some(1920),
        height: Some(1080),
        duration_secs: None,
    };
    let flags = format.compile(&ctx).unwrap();
    assert_eq!(find(&flags, "-s").unwrap().value.as_deref(), Some("1920x1080"));

    // Without source dimensions the compile fails rather than guessing.
    assert!(format.compile(&CompileContext::default()).is_err());
}

#[test]
fn disable_flags_emit_bare() {
    let mut format = Format::output();
    format.disable_audio();
    let flags = compile(&format);
    let an = find(&flags, "-an").unwrap();
    assert!(an.value.is_none());
}

#[test]
fn strictness_levels_render_their_engine_names() {
    let mut format = Format::output();
    format.set_strictness(Strictness::Experimental);
    let flags = compile(&format);
    assert_eq!(find(&flags, "-strict").unwrap().value.as_deref(), Some("experimental"));
}

#[test]
fn removed_filter_flag_suppresses_the_whole_group() {
    let mut format = Format::output();
    format.add_video_filter("scale=640:480").unwrap();
    format.set_padding(640, 520, 0, 20).unwrap();
    format.remove_command("-vf");

    let flags = compile(&format);
    assert!(find(&flags, "-vf").is_none());
}
